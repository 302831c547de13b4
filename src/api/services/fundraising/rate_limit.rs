//! 公开报名接口限流

use actix_governor::{Governor, GovernorConfigBuilder, KeyExtractor, SimpleKeyExtractionError};
use actix_web::dev::ServiceRequest;
use actix_web::{HttpResponse, HttpResponseBuilder};
use governor::NotUntil;
use governor::clock::{Clock, DefaultClock, QuantaInstant};
use governor::middleware::NoOpMiddleware;
use tracing::{debug, warn};

use crate::config::RegistrationConfig;

use super::error_code::ErrorCode;
use super::types::ApiResponse;

/// 按连接 IP 限流
///
/// 只使用 TCP peer address，不读取 X-Forwarded-For（可被伪造）。
/// 拿不到 peer 地址时（如测试请求）归入同一个桶。
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor;

impl KeyExtractor for ClientIpKeyExtractor {
    type Key = String;
    type KeyExtractionError = SimpleKeyExtractionError<&'static str>;

    fn extract(&self, req: &ServiceRequest) -> Result<Self::Key, Self::KeyExtractionError> {
        let key = req
            .connection_info()
            .peer_addr()
            .unwrap_or("unknown")
            .to_string();
        Ok(key)
    }

    /// 超限时也返回统一的 `{code,message}` 信封
    fn exceed_rate_limit_response(
        &self,
        negative: &NotUntil<QuantaInstant>,
        mut response: HttpResponseBuilder,
    ) -> HttpResponse {
        let wait_secs = negative
            .wait_time_from(DefaultClock::default().now())
            .as_secs()
            .max(1);
        debug!("Registration rate limit exceeded, retry in {}s", wait_secs);
        response.json(ApiResponse::<()> {
            code: ErrorCode::RateLimitExceeded as i32,
            message: format!("Too many requests, retry in {}s", wait_secs),
            data: None,
        })
    }
}

/// 报名限流中间件；取值非法时返回 None（不限流）
pub fn registration_rate_limiter(
    config: &RegistrationConfig,
) -> Option<Governor<ClientIpKeyExtractor, NoOpMiddleware>> {
    let governor_config = GovernorConfigBuilder::default()
        .requests_per_second(config.rate_limit_per_second)
        .burst_size(config.rate_limit_burst)
        .key_extractor(ClientIpKeyExtractor)
        .finish();

    match governor_config {
        Some(cfg) => {
            debug!(
                "Registration rate limiter created: {} req/s, burst {}",
                config.rate_limit_per_second, config.rate_limit_burst
            );
            Some(Governor::new(&cfg))
        }
        None => {
            warn!(
                "Invalid registration rate limit ({} req/s, burst {}), limiter disabled",
                config.rate_limit_per_second, config.rate_limit_burst
            );
            None
        }
    }
}
