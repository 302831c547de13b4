//! 对账与导出端点

use actix_web::{HttpResponse, Responder, Result as ActixResult, web};
use std::sync::Arc;
use tracing::info;

use crate::services::ReconciliationService;
use crate::storage::OrderFilter;
use crate::utils::csv_handler::generate_export_filename;

use super::helpers::{api_result, error_from_fundlinker};
use super::types::OrderQuery;

/// GET /campaigns/{campaign_id}/reconciliation
pub async fn get_reconciliation(
    path: web::Path<String>,
    reconciliation: web::Data<Arc<ReconciliationService>>,
) -> ActixResult<impl Responder> {
    let campaign_id = path.into_inner();
    Ok(api_result(
        reconciliation.campaign_report(&campaign_id).await,
    ))
}

/// GET /campaigns/{campaign_id}/reconciliation/export
pub async fn export_reconciliation(
    path: web::Path<String>,
    query: web::Query<OrderQuery>,
    reconciliation: web::Data<Arc<ReconciliationService>>,
) -> ActixResult<impl Responder> {
    let campaign_id = path.into_inner();
    let filter = OrderFilter::from(query.into_inner());

    let body = match reconciliation.export_csv(&campaign_id, &filter).await {
        Ok(body) => body,
        Err(e) => return Ok(error_from_fundlinker(&e)),
    };

    let filename = generate_export_filename(&campaign_id);

    info!(
        campaign_id = %campaign_id,
        "Reconciliation export generated ({} bytes)",
        body.len()
    );

    Ok(HttpResponse::Ok()
        .append_header(("Content-Type", "text/csv; charset=utf-8"))
        .append_header((
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", filename),
        ))
        .body(body))
}
