use serde::Deserialize;
use serde_json::json;

use crate::db::models::{NotificationCategory, NotificationEvent};
use crate::error::AppResult;

use super::{
    deliver_to_receiver, entity_title, find_user, parse_data, primary_receiver, DispatchContext,
    EmailResources, EntityType, ResourceIds, TypedNotification,
};

#[derive(Debug, Clone, Deserialize)]
struct RepostData {
    #[serde(rename = "type")]
    entity_type: EntityType,
    user_id: i32,
    repost_item_id: i32,
    #[serde(default)]
    is_repost_of_repost: bool,
}

/// The `is_repost_of_repost` flag selects the variant: a repost of a repost
/// uses different message copy than a repost of an owned entity.
pub fn from_event(event: &NotificationEvent) -> Option<TypedNotification> {
    let data: RepostData = parse_data(event)?;
    let receiver_user_id = primary_receiver(event)?;

    if data.is_repost_of_repost {
        Some(TypedNotification::RepostOfRepost(RepostOfRepost {
            reposter_user_id: data.user_id,
            entity_type: data.entity_type,
            item_id: data.repost_item_id,
            receiver_user_id,
            additional_count: 0,
        }))
    } else {
        Some(TypedNotification::Repost(Repost {
            reposter_user_id: data.user_id,
            entity_type: data.entity_type,
            item_id: data.repost_item_id,
            receiver_user_id,
            additional_count: 0,
        }))
    }
}

#[derive(Debug, Clone)]
pub struct Repost {
    pub reposter_user_id: i32,
    pub entity_type: EntityType,
    pub item_id: i32,
    pub receiver_user_id: i32,
    pub additional_count: usize,
}

impl Repost {
    pub async fn dispatch(&self, ctx: &DispatchContext) -> AppResult<()> {
        let users = ctx
            .discovery
            .users_by_ids(&[self.reposter_user_id, self.receiver_user_id])
            .await?;
        let reposter = match find_user(&users, self.reposter_user_id) {
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
            "{} reposted your {} {}",
            reposter.display_name(),
            self.entity_type.noun(),
            title
        );
        let email_entry = json!({
            "type": "repost",
            "users": [{
                "userId": reposter.user_id,
                "handle": reposter.handle,
                "name": reposter.name,
            }],
            "entity": {"type": self.entity_type, "id": self.item_id, "name": title},
            "text": body,
        });

        deliver_to_receiver(
            ctx,
            receiver,
            Some(self.reposter_user_id),
            NotificationCategory::Reposts,
            "New Repost",
            &body,
            json!({"type": "repost", "entityId": self.item_id}),
            Some(email_entry),
        )
        .await
    }

    pub fn resource_ids(&self) -> ResourceIds {
        resource_ids_for(self.reposter_user_id, self.entity_type, self.item_id)
    }

    pub fn format_for_email(&self, resources: &EmailResources) -> Option<serde_json::Value> {
        format_email_entry(
            "repost",
            "reposted",
            self.reposter_user_id,
            self.entity_type,
            self.item_id,
            self.additional_count,
            resources,
        )
    }
}

#[derive(Debug, Clone)]
pub struct RepostOfRepost {
    pub reposter_user_id: i32,
    pub entity_type: EntityType,
    pub item_id: i32,
    pub receiver_user_id: i32,
    pub additional_count: usize,
}

impl RepostOfRepost {
    pub async fn dispatch(&self, ctx: &DispatchContext) -> AppResult<()> {
        let users = ctx
            .discovery
            .users_by_ids(&[self.reposter_user_id, self.receiver_user_id])
            .await?;
        let reposter = match find_user(&users, self.reposter_user_id) {
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
            "{} reposted your repost of {}",
            reposter.display_name(),
            title
        );
        let email_entry = json!({
            "type": "repost_of_repost",
            "users": [{
                "userId": reposter.user_id,
                "handle": reposter.handle,
                "name": reposter.name,
            }],
            "entity": {"type": self.entity_type, "id": self.item_id, "name": title},
            "text": body,
        });

        deliver_to_receiver(
            ctx,
            receiver,
            Some(self.reposter_user_id),
            NotificationCategory::Reposts,
            "New Repost",
            &body,
            json!({"type": "repost_of_repost", "entityId": self.item_id}),
            Some(email_entry),
        )
        .await
    }

    pub fn resource_ids(&self) -> ResourceIds {
        resource_ids_for(self.reposter_user_id, self.entity_type, self.item_id)
    }

    pub fn format_for_email(&self, resources: &EmailResources) -> Option<serde_json::Value> {
        format_email_entry(
            "repost_of_repost",
            "reposted your repost of",
            self.reposter_user_id,
            self.entity_type,
            self.item_id,
            self.additional_count,
            resources,
        )
    }
}

pub(super) fn resource_ids_for(user_id: i32, entity: EntityType, item_id: i32) -> ResourceIds {
    let mut ids = ResourceIds {
        user_ids: vec![user_id],
        ..Default::default()
    };
    match entity {
        EntityType::Track => ids.track_ids.push(item_id),
        EntityType::Playlist | EntityType::Album => ids.playlist_ids.push(item_id),
    }
    ids
}

pub(super) fn entity_name(
    entity: EntityType,
    item_id: i32,
    resources: &EmailResources,
) -> Option<String> {
    match entity {
        EntityType::Track => resources.tracks.get(&item_id).map(|t| t.title.clone()),
        EntityType::Playlist | EntityType::Album => resources
            .playlists
            .get(&item_id)
            .map(|p| p.playlist_name.clone()),
    }
}

pub(super) fn format_email_entry(
    kind: &str,
    verb: &str,
    actor_id: i32,
    entity: EntityType,
    item_id: i32,
    additional_count: usize,
    resources: &EmailResources,
) -> Option<serde_json::Value> {
    let actor = resources.users.get(&actor_id)?;
    let name = entity_name(entity, item_id, resources)?;

    let text = if additional_count > 0 {
        format!(
            "{} and {} others {} {}",
            actor.display_name(),
            additional_count,
            verb,
            name
        )
    } else {
        format!("{} {} {}", actor.display_name(), verb, name)
    };

    Some(json!({
        "type": kind,
        "users": [{
            "userId": actor.user_id,
            "handle": actor.handle,
            "name": actor.name,
        }],
        "entity": {"type": entity, "id": item_id, "name": name},
        "count": additional_count + 1,
        "text": text,
    }))
}
