use serde::Deserialize;
use serde_json::json;

use crate::db::models::{NotificationCategory, NotificationEvent};
use crate::error::AppResult;

use super::{
    deliver_to_receiver, find_user, parse_data, primary_receiver, DispatchContext, EmailResources,
    ResourceIds,
};

#[derive(Debug, Clone, Deserialize)]
struct FollowData {
    follower_user_id: i32,
}

#[derive(Debug, Clone)]
pub struct Follow {
    pub follower_user_id: i32,
    pub receiver_user_id: i32,
    /// Same-group follows folded into this one for email rendering.
    pub additional_count: usize,
}

impl Follow {
    pub fn from_event(event: &NotificationEvent) -> Option<Self> {
        let data: FollowData = parse_data(event)?;
        let receiver_user_id = primary_receiver(event)?;
        Some(Follow {
            follower_user_id: data.follower_user_id,
            receiver_user_id,
            additional_count: 0,
        })
    }

    pub async fn dispatch(&self, ctx: &DispatchContext) -> AppResult<()> {
        let users = ctx
            .discovery
            .users_by_ids(&[self.follower_user_id, self.receiver_user_id])
            .await?;
        let follower = match find_user(&users, self.follower_user_id) {
            Some(u) => u,
            None => return Ok(()),
        };
        let receiver = match find_user(&users, self.receiver_user_id) {
            Some(u) => u,
            None => return Ok(()),
        };

        let body = format!("{} followed you", follower.display_name());
        let email_entry = json!({
            "type": "follow",
            "users": [{
                "userId": follower.user_id,
                "handle": follower.handle,
                "name": follower.name,
            }],
            "text": body,
        });

        deliver_to_receiver(
            ctx,
            receiver,
            Some(self.follower_user_id),
            NotificationCategory::Followers,
            "Follow",
            &body,
            json!({"type": "follow", "userId": self.follower_user_id}),
            Some(email_entry),
        )
        .await
    }

    pub fn resource_ids(&self) -> ResourceIds {
        ResourceIds {
            user_ids: vec![self.follower_user_id],
            ..Default::default()
        }
    }

    pub fn format_for_email(&self, resources: &EmailResources) -> Option<serde_json::Value> {
        let follower = resources.users.get(&self.follower_user_id)?;
        let text = if self.additional_count > 0 {
            format!(
                "{} and {} others followed you",
                follower.display_name(),
                self.additional_count
            )
        } else {
            format!("{} followed you", follower.display_name())
        };

        Some(json!({
            "type": "follow",
            "users": [{
                "userId": follower.user_id,
                "handle": follower.handle,
                "name": follower.name,
            }],
            "count": self.additional_count + 1,
            "text": text,
        }))
    }
}
