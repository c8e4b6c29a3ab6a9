//! Best-effort notification delivery.
//!
//! The engine never depends on delivery succeeding: state transitions
//! commit first and the adapter (CLI, sweeper loop) delivers afterwards.
//! A failed delivery is reported to stderr and dropped.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use url::Url;

pub type NotifyError = Box<dyn std::error::Error + Send + Sync>;

/// Outbound delivery capability consumed by the adapters.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send a message to a single identity.
    async fn notify_user(&self, identity: &str, message: &str) -> Result<(), NotifyError>;

    /// Post a message to a named channel.
    async fn post_channel(&self, _channel: &str, _message: &str) -> Result<(), NotifyError> {
        Ok(()) // default no-op
    }
}

/// Discards everything. Used when no webhook is configured.
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn notify_user(&self, _identity: &str, _message: &str) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Posts JSON payloads to a configured webhook endpoint.
pub struct WebhookNotifier {
    webhook_url: String,
    client: Client,
}

impl WebhookNotifier {
    /// Validate the endpoint and build a notifier.
    pub fn new(webhook_url: &str) -> Result<Self, NotifyError> {
        let url = Url::parse(webhook_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(format!("webhook URL must be http(s), got {}", url.scheme()).into());
        }
        Ok(Self {
            webhook_url: webhook_url.to_string(),
            client: Client::new(),
        })
    }

    async fn post(&self, body: serde_json::Value) -> Result<(), NotifyError> {
        let resp = self
            .client
            .post(&self.webhook_url)
            .json(&body)
            .send()
            .await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            Err(format!("webhook error (HTTP {status}): {text}").into())
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify_user(&self, identity: &str, message: &str) -> Result<(), NotifyError> {
        self.post(json!({ "to": identity, "content": message })).await
    }

    async fn post_channel(&self, channel: &str, message: &str) -> Result<(), NotifyError> {
        self.post(json!({ "channel": channel, "content": message }))
            .await
    }
}

/// Deliver to one identity, logging and dropping failures.
pub async fn deliver(notifier: &dyn Notifier, identity: &str, message: &str) {
    if let Err(e) = notifier.notify_user(identity, message).await {
        eprintln!("Warning: failed to notify {identity}: {e}");
    }
}
