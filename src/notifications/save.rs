use serde::Deserialize;
use serde_json::json;

use crate::db::models::{NotificationCategory, NotificationEvent};
use crate::error::AppResult;

use super::repost::{format_email_entry, resource_ids_for};
use super::{
    deliver_to_receiver, entity_title, find_user, parse_data, primary_receiver, DispatchContext,
    EmailResources, EntityType, ResourceIds, TypedNotification,
};

#[derive(Debug, Clone, Deserialize)]
struct SaveData {
    #[serde(rename = "type")]
    entity_type: EntityType,
    user_id: i32,
    save_item_id: i32,
    #[serde(default)]
    is_save_of_repost: bool,
}

pub fn from_event(event: &NotificationEvent) -> Option<TypedNotification> {
    let data: SaveData = parse_data(event)?;
    let receiver_user_id = primary_receiver(event)?;

    if data.is_save_of_repost {
        Some(TypedNotification::SaveOfRepost(SaveOfRepost {
            saver_user_id: data.user_id,
            entity_type: data.entity_type,
            item_id: data.save_item_id,
            receiver_user_id,
            additional_count: 0,
        }))
    } else {
        Some(TypedNotification::Save(Save {
            saver_user_id: data.user_id,
            entity_type: data.entity_type,
            item_id: data.save_item_id,
            receiver_user_id,
            additional_count: 0,
        }))
    }
}

#[derive(Debug, Clone)]
pub struct Save {
    pub saver_user_id: i32,
    pub entity_type: EntityType,
    pub item_id: i32,
    pub receiver_user_id: i32,
    pub additional_count: usize,
}

impl Save {
    pub async fn dispatch(&self, ctx: &DispatchContext) -> AppResult<()> {
        let users = ctx
            .discovery
            .users_by_ids(&[self.saver_user_id, self.receiver_user_id])
            .await?;
        let saver = match find_user(&users, self.saver_user_id) {
            Some(u) => u,
            None => return Ok(()),
        };
        let receiver = match find_user(&users, self.receiver_user_id) {
            Some(u) => u,
            None => return Ok(()),
        };
        let title = match entity_title(ctx, self.entity_type, self.item_id).await? {
            Some(t) => t,
            None => return Ok(()),
        };

        let body = format!(
            "{} favorited your {} {}",
            saver.display_name(),
            self.entity_type.noun(),
            title
        );
        let email_entry = json!({
            "type": "save",
            "users": [{
                "userId": saver.user_id,
                "handle": saver.handle,
                "name": saver.name,
            }],
            "entity": {"type": self.entity_type, "id": self.item_id, "name": title},
            "text": body,
        });

        deliver_to_receiver(
            ctx,
            receiver,
            Some(self.saver_user_id),
            NotificationCategory::Favorites,
            "New Favorite",
            &body,
            json!({"type": "save", "entityId": self.item_id}),
            Some(email_entry),
        )
        .await
    }

    pub fn resource_ids(&self) -> ResourceIds {
        resource_ids_for(self.saver_user_id, self.entity_type, self.item_id)
    }

    pub fn format_for_email(&self, resources: &EmailResources) -> Option<serde_json::Value> {
        format_email_entry(
            "save",
            "favorited",
            self.saver_user_id,
            self.entity_type,
            self.item_id,
            self.additional_count,
            resources,
        )
    }
}

#[derive(Debug, Clone)]
pub struct SaveOfRepost {
    pub saver_user_id: i32,
    pub entity_type: EntityType,
    pub item_id: i32,
    pub receiver_user_id: i32,
    pub additional_count: usize,
}

impl SaveOfRepost {
    pub async fn dispatch(&self, ctx: &DispatchContext) -> AppResult<()> {
        let users = ctx
            .discovery
            .users_by_ids(&[self.saver_user_id, self.receiver_user_id])
            .await?;
        let saver = match find_user(&users, self.saver_user_id) {
            Some(u) => u,
            None => return Ok(()),
        };
        let receiver = match find_user(&users, self.receiver_user_id) {
            Some(u) => u,
            None => return Ok(()),
        };
        let title = match entity_title(ctx, self.entity_type, self.item_id).await? {
            Some(t) => t,
            None => return Ok(()),
        };

        let body = format!(
            "{} favorited your repost of {}",
            saver.display_name(),
            title
        );
        let email_entry = json!({
            "type": "save_of_repost",
            "users": [{
                "userId": saver.user_id,
                "handle": saver.handle,
                "name": saver.name,
            }],
            "entity": {"type": self.entity_type, "id": self.item_id, "name": title},
            "text": body,
        });

        deliver_to_receiver(
            ctx,
            receiver,
            Some(self.saver_user_id),
            NotificationCategory::Favorites,
            "New Favorite",
            &body,
            json!({"type": "save_of_repost", "entityId": self.item_id}),
            Some(email_entry),
        )
        .await
    }

    pub fn resource_ids(&self) -> ResourceIds {
        resource_ids_for(self.saver_user_id, self.entity_type, self.item_id)
    }

    pub fn format_for_email(&self, resources: &EmailResources) -> Option<serde_json::Value> {
        format_email_entry(
            "save_of_repost",
            "favorited your repost of",
            self.saver_user_id,
            self.entity_type,
            self.item_id,
            self.additional_count,
            resources,
        )
    }
}
