use std::env;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub listener: ListenerConfig,
    pub dm: DmConfig,
    pub push: PushConfig,
    pub email: EmailConfig,
    pub digest: DigestConfig,
    pub remote_config: RemoteConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Discovery store: notification, users, tracks, playlists, chat tables.
    pub discovery_url: String,
    /// Identity store: devices, settings, badge counts, email history, cursors.
    pub identity_url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListenerConfig {
    /// LISTEN/NOTIFY channel the insert trigger publishes on.
    pub channel: String,
    /// Batch processor drain interval in milliseconds.
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DmConfig {
    pub poll_interval_ms: u64,
    /// Grace window before an unread message triggers a push, so the
    /// receiver has a chance to read it first.
    pub notification_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushConfig {
    pub relay_url: String,
    pub api_key: Option<String>,
    pub provider_region: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    pub relay_url: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DigestConfig {
    pub live_interval_seconds: u64,
    pub daily_interval_seconds: u64,
    pub weekly_interval_seconds: u64,
    /// Users fetched per eligibility page.
    pub page_size: i64,
    /// Entries included per digest email.
    pub max_notifications_per_email: usize,
    /// Wall-clock ceiling for a single aggregation run.
    pub max_run_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    /// Remote feature-flag service. When unset, every notification kind is
    /// treated as email-eligible.
    pub url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Config {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8080".to_string())
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("PORT".to_string()))?,
            },
            database: DatabaseConfig {
                discovery_url: env::var("DISCOVERY_DATABASE_URL")
                    .map_err(|_| ConfigError::MissingEnv("DISCOVERY_DATABASE_URL".to_string()))?,
                identity_url: env::var("IDENTITY_DATABASE_URL")
                    .map_err(|_| ConfigError::MissingEnv("IDENTITY_DATABASE_URL".to_string()))?,
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .unwrap_or(5),
            },
            listener: ListenerConfig {
                channel: env::var("NOTIFICATION_CHANNEL")
                    .unwrap_or_else(|_| "notification".to_string()),
                poll_interval_ms: env::var("POLL_INTERVAL_MS")
                    .unwrap_or_else(|_| "500".to_string())
                    .parse()
                    .unwrap_or(500),
            },
            dm: DmConfig {
                poll_interval_ms: env::var("DM_POLL_INTERVAL_MS")
                    .unwrap_or_else(|_| "60000".to_string())
                    .parse()
                    .unwrap_or(60_000),
                notification_delay_ms: env::var("DM_NOTIFICATION_DELAY_MS")
                    .unwrap_or_else(|_| "300000".to_string())
                    .parse()
                    .unwrap_or(300_000),
            },
            push: PushConfig {
                relay_url: env::var("PUSH_RELAY_URL")
                    .unwrap_or_else(|_| "http://localhost:7000".to_string()),
                api_key: env::var("PUSH_RELAY_API_KEY").ok(),
                provider_region: env::var("PUSH_PROVIDER_REGION")
                    .unwrap_or_else(|_| "us-west-1".to_string()),
            },
            email: EmailConfig {
                relay_url: env::var("EMAIL_RELAY_URL")
                    .unwrap_or_else(|_| "http://localhost:7001".to_string()),
                api_key: env::var("EMAIL_RELAY_API_KEY").ok(),
            },
            digest: DigestConfig {
                live_interval_seconds: env::var("DIGEST_LIVE_INTERVAL_SECONDS")
                    .unwrap_or_else(|_| "600".to_string())
                    .parse()
                    .unwrap_or(600),
                daily_interval_seconds: env::var("DIGEST_DAILY_INTERVAL_SECONDS")
                    .unwrap_or_else(|_| "3600".to_string())
                    .parse()
                    .unwrap_or(3600),
                weekly_interval_seconds: env::var("DIGEST_WEEKLY_INTERVAL_SECONDS")
                    .unwrap_or_else(|_| "3600".to_string())
                    .parse()
                    .unwrap_or(3600),
                page_size: env::var("DIGEST_PAGE_SIZE")
                    .unwrap_or_else(|_| "100".to_string())
                    .parse()
                    .unwrap_or(100),
                max_notifications_per_email: env::var("DIGEST_MAX_NOTIFICATIONS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .unwrap_or(5),
                max_run_seconds: env::var("DIGEST_MAX_RUN_SECONDS")
                    .unwrap_or_else(|_| "14400".to_string())
                    .parse()
                    .unwrap_or(14_400),
            },
            remote_config: RemoteConfig {
                url: env::var("REMOTE_CONFIG_URL").ok(),
            },
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                discovery_url: "postgres://localhost/discovery".to_string(),
                identity_url: "postgres://localhost/identity".to_string(),
                max_connections: 5,
            },
            listener: ListenerConfig {
                channel: "notification".to_string(),
                poll_interval_ms: 500,
            },
            dm: DmConfig {
                poll_interval_ms: 60_000,
                notification_delay_ms: 300_000,
            },
            push: PushConfig {
                relay_url: "http://localhost:7000".to_string(),
                api_key: None,
                provider_region: "us-west-1".to_string(),
            },
            email: EmailConfig {
                relay_url: "http://localhost:7001".to_string(),
                api_key: None,
            },
            digest: DigestConfig {
                live_interval_seconds: 600,
                daily_interval_seconds: 3600,
                weekly_interval_seconds: 3600,
                page_size: 100,
                max_notifications_per_email: 5,
                max_run_seconds: 14_400,
            },
            remote_config: RemoteConfig { url: None },
        }
    }
}
