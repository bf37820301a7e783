use serde::Deserialize;
use serde_json::json;

use crate::db::models::{NotificationCategory, NotificationEvent};
use crate::error::AppResult;

use super::repost::entity_name;
use super::{
    deliver_with_settings, entity_title, find_user, parse_data, DispatchContext, EmailResources,
    EntityType, ResourceIds,
};

#[derive(Debug, Clone, Deserialize)]
struct CreateData {
    #[serde(rename = "type")]
    entity_type: EntityType,
    entity_id: i32,
    user_id: i32,
}

/// An artist released a new entity; fans out to every subscribed follower in
/// `user_ids`.
#[derive(Debug, Clone)]
pub struct Create {
    pub entity_type: EntityType,
    pub entity_id: i32,
    pub owner_user_id: i32,
    pub receiver_user_ids: Vec<i32>,
    pub additional_count: usize,
}

impl Create {
    pub fn from_event(event: &NotificationEvent) -> Option<Self> {
        let data: CreateData = parse_data(event)?;
        if event.user_ids.is_empty() {
            tracing::warn!("Skipping create notification {}: no recipients", event.id);
            return None;
        }
        Some(Create {
            entity_type: data.entity_type,
            entity_id: data.entity_id,
            owner_user_id: data.user_id,
            receiver_user_ids: event.user_ids.clone(),
            additional_count: 0,
        })
    }

    pub async fn dispatch(&self, ctx: &DispatchContext) -> AppResult<()> {
        let mut ids = self.receiver_user_ids.clone();
        ids.push(self.owner_user_id);
        let users = ctx.discovery.users_by_ids(&ids).await?;
        let owner = match find_user(&users, self.owner_user_id) {
            Some(u) => u.clone(),
            None => return Ok(()),
        };
        let title = match entity_title(ctx, self.entity_type, self.entity_id).await? {
            Some(t) => t,
            None => return Ok(()),
        };

        let body = format!(
            "{} released a new {} {}",
            owner.display_name(),
            self.entity_type.noun(),
            title
        );
        let email_entry = json!({
            "type": "create",
            "users": [{
                "userId": owner.user_id,
                "handle": owner.handle,
                "name": owner.name,
            }],
            "entity": {"type": self.entity_type, "id": self.entity_id, "name": title},
            "text": body,
        });

        // One settings fetch for the whole fan-out; each receiver is then
        // gated individually.
        let bundle = ctx.identity.settings_for_users(&ids).await?;

        for &receiver_id in &self.receiver_user_ids {
            let receiver = match find_user(&users, receiver_id) {
                Some(u) => u,
                None => continue,
            };
            if receiver.is_deactivated {
                continue;
            }
            if bundle.pair_blocked(self.owner_user_id, receiver_id) {
                continue;
            }
            let settings = bundle.get(receiver_id);
            deliver_with_settings(
                ctx,
                receiver_id,
                &settings,
                NotificationCategory::Followers,
                "New Artist Update",
                &body,
                json!({"type": "create", "entityId": self.entity_id}),
                Some(email_entry.clone()),
            )
            .await?;
        }

        Ok(())
    }

    pub fn resource_ids(&self) -> ResourceIds {
        let mut ids = ResourceIds {
            user_ids: vec![self.owner_user_id],
            ..Default::default()
        };
        match self.entity_type {
            EntityType::Track => ids.track_ids.push(self.entity_id),
            EntityType::Playlist | EntityType::Album => ids.playlist_ids.push(self.entity_id),
        }
        ids
    }

    pub fn format_for_email(&self, resources: &EmailResources) -> Option<serde_json::Value> {
        let owner = resources.users.get(&self.owner_user_id)?;
        let name = entity_name(self.entity_type, self.entity_id, resources)?;
        let text = if self.additional_count > 0 {
            format!(
                "{} released {} new {}s including {}",
                owner.display_name(),
                self.additional_count + 1,
                self.entity_type.noun(),
                name
            )
        } else {
            format!(
                "{} released a new {} {}",
                owner.display_name(),
                self.entity_type.noun(),
                name
            )
        };
        Some(json!({
            "type": "create",
            "users": [{
                "userId": owner.user_id,
                "handle": owner.handle,
                "name": owner.name,
            }],
            "entity": {"type": self.entity_type, "id": self.entity_id, "name": name},
            "count": self.additional_count + 1,
            "text": text,
        }))
    }
}
