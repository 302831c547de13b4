//! 欢迎消息投递
//!
//! 只在新报名时发送；失败只记日志，不影响报名结果。
//! Webhook 使用同步的 ureq，放在 spawn_blocking 里执行。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};
use ureq::Agent;

use crate::errors::{FundlinkerError, Result};

/// 欢迎消息内容
#[derive(Debug, Clone, Serialize)]
pub struct WelcomeMessage {
    pub student_id: String,
    pub seller_name: String,
    pub email: Option<String>,
    pub campaign_id: String,
    pub campaign_name: String,
    pub selling_url: String,
    pub portal_url: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_welcome(&self, message: &WelcomeMessage) -> Result<()>;

    fn name(&self) -> &'static str;
}

/// 未配置 webhook 时只写日志
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_welcome(&self, message: &WelcomeMessage) -> Result<()> {
        info!(
            student_id = %message.student_id,
            campaign_id = %message.campaign_id,
            "Welcome message for {}: {}",
            message.seller_name,
            message.selling_url
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

pub struct WebhookNotifier {
    url: String,
    agent: Agent,
}

impl WebhookNotifier {
    pub fn new(url: &str, timeout_secs: u64) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(timeout_secs.max(1))))
            .build()
            .into();
        Self {
            url: url.to_string(),
            agent,
        }
    }

    fn post_sync(agent: Agent, url: String, payload: WelcomeMessage) -> Result<()> {
        agent
            .post(&url)
            .send_json(&payload)
            .map(|_| ())
            .map_err(|e| FundlinkerError::transient(format!("webhook '{}' failed: {}", url, e)))
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send_welcome(&self, message: &WelcomeMessage) -> Result<()> {
        let agent = self.agent.clone();
        let url = self.url.clone();
        let payload = message.clone();

        tokio::task::spawn_blocking(move || Self::post_sync(agent, url, payload))
            .await
            .map_err(|e| FundlinkerError::transient(format!("webhook task failed: {}", e)))??;

        debug!(student_id = %message.student_id, "Welcome webhook delivered");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "webhook"
    }
}

/// 根据配置选择投递方式
pub fn notifier_from_config() -> Arc<dyn Notifier> {
    let config = crate::config::get_config();
    match config.notifications.webhook_url.as_deref() {
        Some(url) if !url.trim().is_empty() => Arc::new(WebhookNotifier::new(
            url.trim(),
            config.notifications.timeout_secs,
        )),
        _ => Arc::new(LogNotifier),
    }
}

/// 后台发送，不等待结果
pub fn dispatch_welcome(notifier: Arc<dyn Notifier>, message: WelcomeMessage) {
    tokio::spawn(async move {
        if let Err(e) = notifier.send_welcome(&message).await {
            warn!(
                student_id = %message.student_id,
                notifier = notifier.name(),
                "Welcome message not sent: {}",
                e
            );
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> WelcomeMessage {
        WelcomeMessage {
            student_id: "s1".to_string(),
            seller_name: "Jane Doe".to_string(),
            email: Some("jane@x.com".to_string()),
            campaign_id: "c1".to_string(),
            campaign_name: "Spring Sale".to_string(),
            selling_url: "http://localhost:8080/s/abc".to_string(),
            portal_url: "http://localhost:8080/portal/abc".to_string(),
        }
    }

    #[tokio::test]
    async fn test_log_notifier_never_fails() {
        assert!(LogNotifier.send_welcome(&message()).await.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_webhook_is_an_error() {
        // 端口 9 (discard) 在测试环境中不会有 HTTP 服务
        let notifier = WebhookNotifier::new("http://127.0.0.1:9/hook", 1);
        let err = notifier.send_welcome(&message()).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_message_serializes() {
        let json = serde_json::to_value(message()).unwrap();
        assert_eq!(json["seller_name"], "Jane Doe");
        assert_eq!(json["selling_url"], "http://localhost:8080/s/abc");
    }
}
