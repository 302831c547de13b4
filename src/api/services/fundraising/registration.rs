//! 公开报名与售卖链接端点

use actix_web::{Responder, Result as ActixResult, web};
use std::sync::Arc;
use tracing::{info, trace};

use crate::services::{OnlineOrderRequest, OrderService, RegistrationService, SellerProfile};

use super::helpers::{api_result, created_response, error_from_fundlinker, success_response};

/// GET /join/{register_code}
pub async fn get_campaign_info(
    path: web::Path<String>,
    registration: web::Data<Arc<RegistrationService>>,
) -> ActixResult<impl Responder> {
    let register_code = path.into_inner();
    trace!("Campaign info requested for register code");
    Ok(api_result(
        registration.campaign_public_info(&register_code).await,
    ))
}

/// POST /join/{register_code}
///
/// 首次报名返回 201，重复报名返回 200 和已有的链接
pub async fn register_seller(
    path: web::Path<String>,
    body: web::Json<SellerProfile>,
    registration: web::Data<Arc<RegistrationService>>,
) -> ActixResult<impl Responder> {
    let register_code = path.into_inner();
    let profile = body.into_inner();

    Ok(match registration.register(&register_code, &profile).await {
        Ok(outcome) if outcome.already_registered => {
            info!(
                student_id = %outcome.student_id,
                campaign_id = %outcome.campaign_id,
                "Repeat registration returned existing link"
            );
            success_response(outcome)
        }
        Ok(outcome) => created_response(outcome),
        Err(e) => error_from_fundlinker(&e),
    })
}

/// GET /s/{magic_code}
pub async fn get_selling_context(
    path: web::Path<String>,
    registration: web::Data<Arc<RegistrationService>>,
) -> ActixResult<impl Responder> {
    let magic_code = path.into_inner();
    Ok(api_result(registration.resolve_magic_code(&magic_code).await))
}

/// POST /s/{magic_code}/orders
pub async fn create_link_order(
    path: web::Path<String>,
    body: web::Json<OnlineOrderRequest>,
    orders: web::Data<Arc<OrderService>>,
) -> ActixResult<impl Responder> {
    let magic_code = path.into_inner();
    Ok(
        match orders
            .create_order_via_link(&magic_code, body.into_inner())
            .await
        {
            Ok(receipt) if receipt.replayed => success_response(receipt),
            Ok(receipt) => created_response(receipt),
            Err(e) => error_from_fundlinker(&e),
        },
    )
}
