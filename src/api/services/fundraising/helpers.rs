//! API 帮助函数

use actix_web::error::InternalError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, web};
use serde::Serialize;
use tracing::error;

use crate::errors::FundlinkerError;

use super::error_code::ErrorCode;
use super::types::ApiResponse;

/// 构建 JSON 响应
pub fn json_response<T: Serialize>(
    status: StatusCode,
    code: ErrorCode,
    message: impl Into<String>,
    data: Option<T>,
) -> HttpResponse {
    HttpResponse::build(status)
        .append_header(("Content-Type", "application/json; charset=utf-8"))
        .json(ApiResponse {
            code: code as i32,
            message: message.into(),
            data,
        })
}

pub fn success_response<T: Serialize>(data: T) -> HttpResponse {
    json_response(StatusCode::OK, ErrorCode::Success, "OK", Some(data))
}

pub fn created_response<T: Serialize>(data: T) -> HttpResponse {
    json_response(StatusCode::CREATED, ErrorCode::Success, "Created", Some(data))
}

pub fn error_response(status: StatusCode, error_code: ErrorCode, message: &str) -> HttpResponse {
    json_response::<()>(status, error_code, message, None)
}

/// 从 FundlinkerError 构建错误响应（自动映射 HTTP 状态码和 ErrorCode）
///
/// 基础设施错误只记录日志，不把内部信息返回给调用方
pub fn error_from_fundlinker(err: &FundlinkerError) -> HttpResponse {
    let status = err.http_status();
    let error_code = ErrorCode::from(err);
    if status.is_server_error() {
        error!("API request failed: {}", err);
        let message = if err.is_retryable() {
            "Temporarily unavailable, please retry"
        } else {
            "Internal server error"
        };
        return error_response(status, error_code, message);
    }
    error_response(status, error_code, err.message())
}

/// 统一 Result → HttpResponse 转换
pub fn api_result<T: Serialize>(result: Result<T, FundlinkerError>) -> HttpResponse {
    match result {
        Ok(data) => success_response(data),
        Err(e) => error_from_fundlinker(&e),
    }
}

/// JSON 请求体解析失败时也返回统一信封
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(256 * 1024)
        .error_handler(|err, _req| {
            let message = format!("Invalid request body: {}", err);
            let response = error_response(StatusCode::BAD_REQUEST, ErrorCode::BadRequest, &message);
            InternalError::from_response(err, response).into()
        })
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        let message = format!("Invalid query parameters: {}", err);
        let response = error_response(StatusCode::BAD_REQUEST, ErrorCode::BadRequest, &message);
        InternalError::from_response(err, response).into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_response() {
        let response = success_response("ok");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_error_mapping_status() {
        let response = error_from_fundlinker(&FundlinkerError::order_already_paid("FR-000001"));
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = error_from_fundlinker(&FundlinkerError::transient("database is locked"));
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_api_result_err() {
        let response = api_result::<()>(Err(FundlinkerError::empty_cart("no items")));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
