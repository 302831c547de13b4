//! Service layer
//!
//! HTTP 与 CLI 共用的业务逻辑：身份解析、报名、下单、付款与对账。

mod identity;
mod notifier;
mod order_service;
mod payment_service;
mod reconciliation;
mod registration;

pub use identity::*;
pub use notifier::*;
pub use order_service::*;
pub use payment_service::*;
pub use reconciliation::*;
pub use registration::*;
