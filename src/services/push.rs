use async_trait::async_trait;
use serde::Serialize;

use crate::config::PushConfig;
use crate::error::{AppError, AppResult};

/// Rendered push content handed to the transport.
#[derive(Debug, Clone, Serialize)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub data: serde_json::Value,
}

/// A single device destination. `badge_count` is the value the device should
/// display after this push lands.
#[derive(Debug, Clone, Serialize)]
pub struct PushTarget {
    #[serde(rename = "type")]
    pub device_type: String,
    #[serde(rename = "targetARN")]
    pub target_arn: String,
    #[serde(rename = "badgeCount")]
    pub badge_count: i64,
}

/// Best-effort device push. Failures are caught at the handler boundary and
/// never retried here.
#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn send_push(&self, target: &PushTarget, message: &PushMessage) -> AppResult<()>;

    /// Browser push shares the device-push gating but the transport is not
    /// wired up yet. Must not fail.
    async fn send_browser_push(&self, _user_id: i32, _message: &PushMessage) -> AppResult<()> {
        Ok(())
    }
}

#[derive(Serialize)]
struct PushRequest<'a> {
    device: &'a PushTarget,
    message: &'a PushMessage,
    region: &'a str,
}

/// HTTP client for the push relay fronting the mobile push provider.
pub struct HttpPushRelay {
    client: reqwest::Client,
    relay_url: String,
    api_key: Option<String>,
    region: String,
}

impl HttpPushRelay {
    pub fn new(config: &PushConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            relay_url: config.relay_url.clone(),
            api_key: config.api_key.clone(),
            region: config.provider_region.clone(),
        }
    }
}

#[async_trait]
impl PushTransport for HttpPushRelay {
    async fn send_push(&self, target: &PushTarget, message: &PushMessage) -> AppResult<()> {
        let url = format!("{}/push", self.relay_url.trim_end_matches('/'));
        let mut request = self.client.post(&url).json(&PushRequest {
            device: target,
            message,
            region: &self.region,
        });
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(AppError::Request)?;
        if !response.status().is_success() {
            return Err(AppError::Push(format!(
                "Push relay returned {} for device {}",
                response.status(),
                target.target_arn
            )));
        }

        Ok(())
    }
}
