//! 募捐业务 API
//!
//! - 公开报名（活动信息、报名）
//! - 售卖链接（卖家页面、线上下单）
//! - 员工录单、收款登记
//! - 对账汇总与 CSV 导出
//! - 卖家启用/停用

pub mod error_code;
mod helpers;
mod orders;
pub mod rate_limit;
mod reconciliation;
mod registration;
pub mod routes;
mod sellers;
mod types;

pub use error_code::ErrorCode;
pub use helpers::{
    api_result, created_response, error_from_fundlinker, error_response, json_config,
    json_response, query_config, success_response,
};
pub use routes::api_routes;
pub use types::*;

pub use orders::{create_order, get_order, list_orders, mark_paid};
pub use reconciliation::{export_reconciliation, get_reconciliation};
pub use registration::{create_link_order, get_campaign_info, get_selling_context, register_seller};
pub use sellers::set_seller_active;
