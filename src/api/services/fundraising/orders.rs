//! 订单录入与收款端点

use actix_web::{Responder, Result as ActixResult, web};
use std::sync::Arc;
use tracing::{debug, info};

use crate::services::{CreateOrderRequest, MarkPaidRequest, OrderService, PaymentService};
use crate::storage::OrderFilter;

use super::helpers::{api_result, created_response, error_from_fundlinker, success_response};
use super::types::OrderQuery;

/// POST /campaigns/{campaign_id}/orders
pub async fn create_order(
    path: web::Path<String>,
    body: web::Json<CreateOrderRequest>,
    orders: web::Data<Arc<OrderService>>,
) -> ActixResult<impl Responder> {
    let campaign_id = path.into_inner();
    Ok(
        match orders.create_order(&campaign_id, body.into_inner()).await {
            Ok(receipt) if receipt.replayed => {
                info!(
                    order_number = %receipt.order.order_number,
                    "Order replayed for idempotency key"
                );
                success_response(receipt)
            }
            Ok(receipt) => created_response(receipt),
            Err(e) => error_from_fundlinker(&e),
        },
    )
}

/// GET /campaigns/{campaign_id}/orders
pub async fn list_orders(
    path: web::Path<String>,
    query: web::Query<OrderQuery>,
    orders: web::Data<Arc<OrderService>>,
) -> ActixResult<impl Responder> {
    let campaign_id = path.into_inner();
    let filter = OrderFilter::from(query.into_inner());
    debug!("Listing orders for campaign {} with {:?}", campaign_id, filter);
    Ok(api_result(orders.list_orders(&campaign_id, &filter).await))
}

/// GET /orders/{order_id}
pub async fn get_order(
    path: web::Path<String>,
    orders: web::Data<Arc<OrderService>>,
) -> ActixResult<impl Responder> {
    let order_id = path.into_inner();
    Ok(api_result(orders.get_order(&order_id).await))
}

/// POST /orders/{order_id}/mark-paid
pub async fn mark_paid(
    path: web::Path<String>,
    body: web::Json<MarkPaidRequest>,
    payments: web::Data<Arc<PaymentService>>,
) -> ActixResult<impl Responder> {
    let order_id = path.into_inner();
    Ok(api_result(
        payments.mark_paid(&order_id, body.into_inner()).await,
    ))
}
