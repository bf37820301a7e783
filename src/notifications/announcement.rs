use serde::Deserialize;
use serde_json::json;

use crate::db::models::{NotificationCategory, NotificationEvent};
use crate::error::AppResult;

use super::{
    deliver_with_settings, find_user, parse_data, DispatchContext, EmailResources, ResourceIds,
};

#[derive(Debug, Clone, Deserialize)]
struct AnnouncementData {
    title: String,
    short_description: String,
    #[serde(default)]
    push_body: Option<String>,
}

/// Platform-wide announcement addressed to the users in `user_ids`.
#[derive(Debug, Clone)]
pub struct Announcement {
    pub title: String,
    pub short_description: String,
    pub push_body: Option<String>,
    pub receiver_user_ids: Vec<i32>,
}

impl Announcement {
    pub fn from_event(event: &NotificationEvent) -> Option<Self> {
        let data: AnnouncementData = parse_data(event)?;
        if event.user_ids.is_empty() {
            tracing::warn!("Skipping announcement {}: no recipients", event.id);
            return None;
        }
        Some(Announcement {
            title: data.title,
            short_description: data.short_description,
            push_body: data.push_body,
            receiver_user_ids: event.user_ids.clone(),
        })
    }

    pub async fn dispatch(&self, ctx: &DispatchContext) -> AppResult<()> {
        let users = ctx.discovery.users_by_ids(&self.receiver_user_ids).await?;
        let bundle = ctx
            .identity
            .settings_for_users(&self.receiver_user_ids)
            .await?;

        let body = self
            .push_body
            .clone()
            .unwrap_or_else(|| self.short_description.clone());
        let email_entry = json!({
            "type": "announcement",
            "title": self.title,
            "text": self.short_description,
        });

        for &receiver_id in &self.receiver_user_ids {
            let receiver = match find_user(&users, receiver_id) {
                Some(u) => u,
                None => continue,
            };
            if receiver.is_deactivated {
                continue;
            }
            let settings = bundle.get(receiver_id);
            if settings.is_abusive {
                continue;
            }
            deliver_with_settings(
                ctx,
                receiver_id,
                &settings,
                NotificationCategory::Announcements,
                &self.title,
                &body,
                json!({"type": "announcement"}),
                Some(email_entry.clone()),
            )
            .await?;
        }

        Ok(())
    }

    pub fn resource_ids(&self) -> ResourceIds {
        ResourceIds::default()
    }

    pub fn format_for_email(&self, _resources: &EmailResources) -> Option<serde_json::Value> {
        Some(json!({
            "type": "announcement",
            "title": self.title,
            "text": self.short_description,
        }))
    }
}
