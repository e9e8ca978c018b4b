//! Chat notification delivery
//!
//! One message per run, sent once. Failures are reported, never retried, and
//! long messages are not split: the chat service rejecting an oversized
//! message is a delivery failure like any other.

use crate::config::NotifierConfig;
use crate::error::{delivery_error, AppResult};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Delivers a finished report to its destination
#[allow(async_fn_in_trait)]
pub trait Notifier {
    async fn send(&self, message: &str) -> AppResult<()>;
}

/// Body of a Discord-style webhook post
#[derive(Debug, Serialize)]
pub struct WebhookPayload<'a> {
    pub content: &'a str,
}

/// Posts messages to a chat webhook
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: url::Url,
}

impl WebhookNotifier {
    pub fn new(url: url::Url, timeout: std::time::Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| delivery_error(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, url })
    }
}

impl Notifier for WebhookNotifier {
    async fn send(&self, message: &str) -> AppResult<()> {
        let response = self
            .client
            .post(self.url.clone())
            .json(&WebhookPayload { content: message })
            .send()
            .await
            .map_err(|e| delivery_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(delivery_error(format!("webhook returned {}: {}", status, body)));
        }

        debug!("Webhook accepted report ({} bytes)", message.len());
        Ok(())
    }
}

/// Writes reports to the log instead of a chat channel
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn send(&self, message: &str) -> AppResult<()> {
        info!("Report (no webhook configured):\n{}", message);
        Ok(())
    }
}

/// The notifier selected by configuration
pub enum ChannelNotifier {
    Webhook(WebhookNotifier),
    Log(LogNotifier),
}

impl ChannelNotifier {
    pub fn from_config(config: &NotifierConfig) -> AppResult<Self> {
        match &config.webhook_url {
            Some(url) => Ok(Self::Webhook(WebhookNotifier::new(url.clone(), config.timeout)?)),
            None => {
                warn!("⚠️  DISCORD_WEBHOOK_URL not set, reports will only be logged");
                Ok(Self::Log(LogNotifier))
            }
        }
    }
}

impl Notifier for ChannelNotifier {
    async fn send(&self, message: &str) -> AppResult<()> {
        match self {
            Self::Webhook(n) => n.send(message).await,
            Self::Log(n) => n.send(message).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_payload_shape() {
        let body = serde_json::to_value(WebhookPayload { content: "-- x --\n" }).unwrap();
        assert_eq!(body, serde_json::json!({ "content": "-- x --\n" }));
    }

    #[test]
    fn test_from_config_without_webhook_logs() {
        let notifier = ChannelNotifier::from_config(&NotifierConfig::default()).unwrap();
        assert!(matches!(notifier, ChannelNotifier::Log(_)));
        tokio_test::block_on(notifier.send("hello")).unwrap();
    }

    #[test]
    fn test_from_config_with_webhook() {
        let config = NotifierConfig {
            webhook_url: Some(url::Url::parse("https://discord.com/api/webhooks/1/abc").unwrap()),
            timeout: Duration::from_secs(1),
        };
        let notifier = ChannelNotifier::from_config(&config).unwrap();
        assert!(matches!(notifier, ChannelNotifier::Webhook(_)));
    }

    #[tokio::test]
    async fn test_unreachable_webhook_is_delivery_failure() {
        // Port 9 on localhost is the discard port; nothing should be listening.
        let notifier = WebhookNotifier::new(
            url::Url::parse("http://127.0.0.1:9/webhook").unwrap(),
            Duration::from_secs(2),
        )
        .unwrap();

        let err = notifier.send("report").await.unwrap_err();
        assert!(matches!(err, crate::error::AppError::Delivery(_)));
    }
}
