//! 路由配置

use actix_web::web;

use crate::config::RegistrationConfig;

use super::helpers::{json_config, query_config};
use super::orders::{create_order, get_order, list_orders, mark_paid};
use super::rate_limit::registration_rate_limiter;
use super::reconciliation::{export_reconciliation, get_reconciliation};
use super::registration::{
    create_link_order, get_campaign_info, get_selling_context, register_seller,
};
use super::sellers::set_seller_active;

/// 公开报名路由 `/join`
///
/// - GET /join/{register_code} - 活动公开信息
/// - POST /join/{register_code} - 报名（按 IP 限流）
pub fn join_routes(registration: &RegistrationConfig) -> actix_web::Scope {
    let mut register = web::post().to(register_seller);
    if let Some(limiter) = registration_rate_limiter(registration) {
        register = register.wrap(limiter);
    }

    web::scope("/join")
        .route("/{register_code}", web::get().to(get_campaign_info))
        .route("/{register_code}", register)
}

/// 售卖链接路由 `/s`
pub fn selling_routes() -> actix_web::Scope {
    web::scope("/s")
        .route("/{magic_code}", web::get().to(get_selling_context))
        .route("/{magic_code}/orders", web::post().to(create_link_order))
}

/// 活动路由 `/campaigns`
///
/// - POST/GET /campaigns/{id}/orders
/// - GET /campaigns/{id}/reconciliation
/// - GET /campaigns/{id}/reconciliation/export
pub fn campaign_routes() -> actix_web::Scope {
    web::scope("/campaigns")
        .route("/{campaign_id}/orders", web::post().to(create_order))
        .route("/{campaign_id}/orders", web::get().to(list_orders))
        .route(
            "/{campaign_id}/reconciliation/export",
            web::get().to(export_reconciliation),
        )
        .route(
            "/{campaign_id}/reconciliation",
            web::get().to(get_reconciliation),
        )
}

pub fn order_routes() -> actix_web::Scope {
    web::scope("/orders")
        .route("/{order_id}", web::get().to(get_order))
        .route("/{order_id}/mark-paid", web::post().to(mark_paid))
}

pub fn seller_routes() -> actix_web::Scope {
    web::scope("/sellers").route("/{student_id}/active", web::put().to(set_seller_active))
}

/// 全部业务路由，挂在 `server.api_prefix` 下
pub fn api_routes(api_prefix: &str, registration: &RegistrationConfig) -> actix_web::Scope {
    web::scope(api_prefix)
        .app_data(json_config())
        .app_data(query_config())
        .service(join_routes(registration))
        .service(selling_routes())
        .service(campaign_routes())
        .service(order_routes())
        .service(seller_routes())
}
