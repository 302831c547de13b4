//! HTTP 接口层
//!
//! - `services::fundraising`: 报名、售卖链接、订单、收款、对账
//! - `services::health`: 健康检查
//! - `middleware`: request id

pub mod middleware;
pub mod services;
