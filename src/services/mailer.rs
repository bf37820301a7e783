use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Serialize;

use crate::config::EmailConfig;
use crate::db::models::EmailFrequency;
use crate::error::{AppError, AppResult};

/// Outcome of an email send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailSendOutcome {
    Sent,
    NothingToSend,
    Failed,
}

/// One digest (or live singleton) email for one recipient. `notifications`
/// carries the render payloads produced by `format_for_email`; the external
/// renderer owns the HTML.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationEmail {
    pub user_id: i32,
    pub email: String,
    pub frequency: EmailFrequency,
    pub notifications: Vec<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send_at: Option<NaiveDateTime>,
}

#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send_notification_email(
        &self,
        request: &NotificationEmail,
    ) -> AppResult<EmailSendOutcome>;
}

/// HTTP client for the email relay fronting the template renderer.
pub struct HttpEmailRelay {
    client: reqwest::Client,
    relay_url: String,
    api_key: Option<String>,
}

impl HttpEmailRelay {
    pub fn new(config: &EmailConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            relay_url: config.relay_url.clone(),
            api_key: config.api_key.clone(),
        }
    }
}

#[derive(serde::Deserialize)]
struct EmailRelayResponse {
    sent: Option<bool>,
}

#[async_trait]
impl EmailTransport for HttpEmailRelay {
    async fn send_notification_email(
        &self,
        request: &NotificationEmail,
    ) -> AppResult<EmailSendOutcome> {
        if request.notifications.is_empty() {
            return Ok(EmailSendOutcome::NothingToSend);
        }

        let url = format!("{}/email", self.relay_url.trim_end_matches('/'));
        let mut http_request = self.client.post(&url).json(request);
        if let Some(ref key) = self.api_key {
            http_request = http_request.bearer_auth(key);
        }

        let response = http_request.send().await.map_err(AppError::Request)?;
        if !response.status().is_success() {
            return Err(AppError::Email(format!(
                "Email relay returned {} for user {}",
                response.status(),
                request.user_id
            )));
        }

        let body: EmailRelayResponse = response.json().await.map_err(AppError::Request)?;
        Ok(match body.sent {
            Some(true) => EmailSendOutcome::Sent,
            Some(false) => EmailSendOutcome::Failed,
            None => EmailSendOutcome::NothingToSend,
        })
    }
}
