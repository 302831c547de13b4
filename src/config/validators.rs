//! 静态配置校验
//!
//! 启动时调用一次，拒绝明显错误的取值，避免运行中才暴露。

use super::StaticConfig;

/// magic link 最少随机字节数（128 bit）
pub const MIN_MAGIC_CODE_BYTES: usize = 16;

pub fn validate_config(config: &StaticConfig) -> Result<(), String> {
    let links = &config.links;

    let base = url::Url::parse(&links.public_base_url)
        .map_err(|e| format!("links.public_base_url '{}': {}", links.public_base_url, e))?;
    if base.scheme() != "http" && base.scheme() != "https" {
        return Err(format!(
            "links.public_base_url must use http or https, got '{}'",
            base.scheme()
        ));
    }

    for (key, path) in [
        ("links.selling_path", &links.selling_path),
        ("links.portal_path", &links.portal_path),
        ("links.join_path", &links.join_path),
    ] {
        if !path.starts_with('/') {
            return Err(format!("{} must start with '/', got '{}'", key, path));
        }
    }

    if links.magic_code_bytes < MIN_MAGIC_CODE_BYTES {
        return Err(format!(
            "links.magic_code_bytes must be >= {}, got {}",
            MIN_MAGIC_CODE_BYTES, links.magic_code_bytes
        ));
    }

    if !(4..=32).contains(&links.seller_code_length) {
        return Err(format!(
            "links.seller_code_length must be within 4..=32, got {}",
            links.seller_code_length
        ));
    }

    let orders = &config.orders;
    if orders.number_prefix.is_empty()
        || !orders
            .number_prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric())
    {
        return Err(format!(
            "orders.number_prefix must be non-empty ASCII alphanumeric, got '{}'",
            orders.number_prefix
        ));
    }
    if !(1..=12).contains(&orders.number_width) {
        return Err(format!(
            "orders.number_width must be within 1..=12, got {}",
            orders.number_width
        ));
    }
    if orders.max_items == 0 {
        return Err("orders.max_items must be > 0".to_string());
    }

    if let Some(ref hook) = config.notifications.webhook_url
        && !hook.is_empty()
    {
        url::Url::parse(hook)
            .map_err(|e| format!("notifications.webhook_url '{}': {}", hook, e))?;
    }

    if config.registration.rate_limit_per_second == 0 || config.registration.rate_limit_burst == 0
    {
        return Err("registration rate limit values must be > 0".to_string());
    }

    Ok(())
}
