use async_trait::async_trait;

use crate::config::RemoteConfig;

/// Remote feature flags, used only to gate which notification kinds are
/// eligible for email aggregation.
#[async_trait]
pub trait RemoteFlags: Send + Sync {
    async fn feature_variable_enabled(&self, feature: &str, variable: &str) -> bool;
}

/// Treats every kind as enabled. Used when no remote-config service is
/// configured, and as the fail-open default.
pub struct StaticFlags;

#[async_trait]
impl RemoteFlags for StaticFlags {
    async fn feature_variable_enabled(&self, _feature: &str, _variable: &str) -> bool {
        true
    }
}

#[derive(serde::Deserialize)]
struct FlagResponse {
    enabled: bool,
}

pub struct HttpRemoteFlags {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRemoteFlags {
    pub fn from_config(config: &RemoteConfig) -> Option<Self> {
        config.url.as_ref().map(|url| Self {
            client: reqwest::Client::new(),
            base_url: url.clone(),
        })
    }
}

#[async_trait]
impl RemoteFlags for HttpRemoteFlags {
    async fn feature_variable_enabled(&self, feature: &str, variable: &str) -> bool {
        let url = format!(
            "{}/features/{}/variables/{}",
            self.base_url.trim_end_matches('/'),
            feature,
            variable
        );

        match self.client.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                match response.json::<FlagResponse>().await {
                    Ok(flag) => flag.enabled,
                    Err(e) => {
                        tracing::warn!("Failed to decode flag {}/{}: {}", feature, variable, e);
                        true
                    }
                }
            }
            Ok(response) => {
                tracing::warn!(
                    "Flag service returned {} for {}/{}",
                    response.status(),
                    feature,
                    variable
                );
                true
            }
            Err(e) => {
                tracing::warn!("Flag service unreachable for {}/{}: {}", feature, variable, e);
                true
            }
        }
    }
}
