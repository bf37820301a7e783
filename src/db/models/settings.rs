use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Notification categories a user can toggle individually.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationCategory {
    Followers,
    Reposts,
    Favorites,
    Remixes,
    Milestones,
    Messages,
    Announcements,
    Tips,
}

/// Per-category push toggles. Every category defaults to enabled; a missing
/// settings row means the user never opted out of anything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationToggles {
    pub followers: bool,
    pub reposts: bool,
    pub favorites: bool,
    pub remixes: bool,
    pub milestones: bool,
    pub messages: bool,
    pub announcements: bool,
    pub tips: bool,
}

impl Default for NotificationToggles {
    fn default() -> Self {
        Self {
            followers: true,
            reposts: true,
            favorites: true,
            remixes: true,
            milestones: true,
            messages: true,
            announcements: true,
            tips: true,
        }
    }
}

impl NotificationToggles {
    pub fn enabled(&self, category: NotificationCategory) -> bool {
        match category {
            NotificationCategory::Followers => self.followers,
            NotificationCategory::Reposts => self.reposts,
            NotificationCategory::Favorites => self.favorites,
            NotificationCategory::Remixes => self.remixes,
            NotificationCategory::Milestones => self.milestones,
            NotificationCategory::Messages => self.messages,
            NotificationCategory::Announcements => self.announcements,
            NotificationCategory::Tips => self.tips,
        }
    }
}

/// A registered push device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushDevice {
    pub device_type: String,
    pub target_arn: String,
    pub enabled: bool,
}

/// User-chosen email cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailFrequency {
    Live,
    Daily,
    Weekly,
    Off,
}

impl EmailFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailFrequency::Live => "live",
            EmailFrequency::Daily => "daily",
            EmailFrequency::Weekly => "weekly",
            EmailFrequency::Off => "off",
        }
    }

    pub fn from_str(value: &str) -> Self {
        match value {
            "live" => EmailFrequency::Live,
            "daily" => EmailFrequency::Daily,
            "weekly" => EmailFrequency::Weekly,
            _ => EmailFrequency::Off,
        }
    }
}

/// Everything a handler needs to know about one recipient, resolved in
/// batched queries per processing pass.
#[derive(Debug, Clone)]
pub struct UserNotificationSettings {
    pub user_id: i32,
    pub devices: Vec<PushDevice>,
    pub toggles: NotificationToggles,
    pub is_abusive: bool,
    pub badge_count: i64,
    pub email: Option<String>,
    pub email_frequency: EmailFrequency,
}

impl UserNotificationSettings {
    /// Defaults used when the identity store has no rows for a user: no
    /// devices, everything toggled on, no email.
    pub fn empty(user_id: i32) -> Self {
        Self {
            user_id,
            devices: Vec::new(),
            toggles: NotificationToggles::default(),
            is_abusive: false,
            badge_count: 0,
            email: None,
            email_frequency: EmailFrequency::Off,
        }
    }

    pub fn enabled_devices(&self) -> impl Iterator<Item = &PushDevice> {
        self.devices.iter().filter(|d| d.enabled)
    }
}

/// Settings bundle for a set of users, keyed by user id. Lookups fall back
/// to `UserNotificationSettings::empty`.
#[derive(Debug, Clone, Default)]
pub struct SettingsBundle {
    pub by_user: HashMap<i32, UserNotificationSettings>,
}

impl SettingsBundle {
    pub fn get(&self, user_id: i32) -> UserNotificationSettings {
        self.by_user
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| UserNotificationSettings::empty(user_id))
    }

    /// True when either side of an interaction is abuse-flagged.
    pub fn pair_blocked(&self, initiator_id: i32, receiver_id: i32) -> bool {
        let initiator_abusive = self
            .by_user
            .get(&initiator_id)
            .map(|s| s.is_abusive)
            .unwrap_or(false);
        let receiver_abusive = self
            .by_user
            .get(&receiver_id)
            .map(|s| s.is_abusive)
            .unwrap_or(false);
        initiator_abusive || receiver_abusive
    }
}

// Row shapes for the identity-store queries; assembled into
// `UserNotificationSettings` by the repository.

#[derive(Debug, Clone, FromRow)]
pub struct SettingsRow {
    pub user_id: i32,
    pub followers: bool,
    pub reposts: bool,
    pub favorites: bool,
    pub remixes: bool,
    pub milestones: bool,
    pub messages: bool,
    pub announcements: bool,
    pub tips: bool,
    pub is_abusive: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct DeviceRow {
    pub user_id: i32,
    pub device_type: String,
    pub target_arn: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct BadgeRow {
    pub user_id: i32,
    pub unread_count: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct EmailSettingsRow {
    pub user_id: i32,
    pub email: String,
    pub frequency: String,
    pub is_deliverable: bool,
}

/// A user eligible for a digest email in the current aggregation pass.
#[derive(Debug, Clone, FromRow)]
pub struct EmailUser {
    pub user_id: i32,
    pub email: String,
}
