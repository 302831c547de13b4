use actix_web::{Responder, Result as ActixResult, web};
use std::sync::Arc;

use crate::services::IdentityResolver;

use super::helpers::api_result;
use super::types::{SellerResponse, SetActiveRequest};

/// PUT /sellers/{student_id}/active
pub async fn set_seller_active(
    path: web::Path<String>,
    body: web::Json<SetActiveRequest>,
    identity: web::Data<Arc<IdentityResolver>>,
) -> ActixResult<impl Responder> {
    let student_id = path.into_inner();
    let result = identity
        .set_seller_active(&student_id, body.active)
        .await
        .map(SellerResponse::from);
    Ok(api_result(result))
}
