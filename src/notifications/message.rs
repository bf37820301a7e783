use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_json::json;

use crate::db::models::{DmEvent, NotificationCategory, NotificationEvent};
use crate::error::AppResult;

use super::{
    deliver_to_receiver, find_user, parse_data, primary_receiver, DispatchContext, EmailResources,
    ResourceIds,
};

#[derive(Debug, Clone, Deserialize)]
struct MessageData {
    sender_user_id: i32,
    #[serde(default)]
    multiple: bool,
}

/// An unread direct message. Built by the DM poll task from chat rows, or by
/// the email aggregation job as a pre-shaped event; both shapes meet here so
/// one formatting path serves push and email.
#[derive(Debug, Clone)]
pub struct Message {
    pub sender_user_id: i32,
    pub receiver_user_id: i32,
    /// Several unread messages from this sender folded into one entry.
    pub multiple: bool,
    pub timestamp: NaiveDateTime,
}

impl Message {
    pub fn from_dm(event: &DmEvent) -> Self {
        Message {
            sender_user_id: event.sender_user_id,
            receiver_user_id: event.receiver_user_id,
            multiple: false,
            timestamp: event.created_at,
        }
    }

    pub fn from_event(event: &NotificationEvent) -> Option<Self> {
        let data: MessageData = parse_data(event)?;
        let receiver_user_id = primary_receiver(event)?;
        Some(Message {
            sender_user_id: data.sender_user_id,
            receiver_user_id,
            multiple: data.multiple,
            timestamp: event.timestamp,
        })
    }

    pub async fn dispatch(&self, ctx: &DispatchContext) -> AppResult<()> {
        let users = ctx
            .discovery
            .users_by_ids(&[self.sender_user_id, self.receiver_user_id])
            .await?;
        let sender = match find_user(&users, self.sender_user_id) {
            Some(u) => u,
            None => return Ok(()),
        };
        let receiver = match find_user(&users, self.receiver_user_id) {
            Some(u) => u,
            None => return Ok(()),
        };

        let body = format!("{} sent you a message", sender.display_name());
        deliver_to_receiver(
            ctx,
            receiver,
            Some(self.sender_user_id),
            NotificationCategory::Messages,
            "Message",
            &body,
            json!({"type": "message", "userId": self.sender_user_id}),
            // Unread DMs reach email through the aggregation job's chat
            // queries, never as live singletons.
            None,
        )
        .await
    }

    pub fn resource_ids(&self) -> ResourceIds {
        ResourceIds {
            user_ids: vec![self.sender_user_id],
            ..Default::default()
        }
    }

    pub fn format_for_email(&self, resources: &EmailResources) -> Option<serde_json::Value> {
        let sender = resources.users.get(&self.sender_user_id)?;
        let text = if self.multiple {
            format!("{} sent you new messages", sender.display_name())
        } else {
            format!("{} sent you a message", sender.display_name())
        };
        Some(json!({
            "type": "message",
            "users": [{
                "userId": sender.user_id,
                "handle": sender.handle,
                "name": sender.name,
            }],
            "multiple": self.multiple,
            "text": text,
        }))
    }
}

/// A reaction to one of the receiver's messages.
#[derive(Debug, Clone)]
pub struct MessageReaction {
    pub sender_user_id: i32,
    pub receiver_user_id: i32,
    pub multiple: bool,
    pub timestamp: NaiveDateTime,
}

impl MessageReaction {
    pub fn from_dm(event: &DmEvent) -> Self {
        MessageReaction {
            sender_user_id: event.sender_user_id,
            receiver_user_id: event.receiver_user_id,
            multiple: false,
            timestamp: event.created_at,
        }
    }

    pub fn from_event(event: &NotificationEvent) -> Option<Self> {
        let data: MessageData = parse_data(event)?;
        let receiver_user_id = primary_receiver(event)?;
        Some(MessageReaction {
            sender_user_id: data.sender_user_id,
            receiver_user_id,
            multiple: data.multiple,
            timestamp: event.timestamp,
        })
    }

    pub async fn dispatch(&self, ctx: &DispatchContext) -> AppResult<()> {
        let users = ctx
            .discovery
            .users_by_ids(&[self.sender_user_id, self.receiver_user_id])
            .await?;
        let sender = match find_user(&users, self.sender_user_id) {
            Some(u) => u,
            None => return Ok(()),
        };
        let receiver = match find_user(&users, self.receiver_user_id) {
            Some(u) => u,
            None => return Ok(()),
        };

        let body = format!("{} reacted to your message", sender.display_name());
        deliver_to_receiver(
            ctx,
            receiver,
            Some(self.sender_user_id),
            NotificationCategory::Messages,
            "Reaction",
            &body,
            json!({"type": "message_reaction", "userId": self.sender_user_id}),
            None,
        )
        .await
    }

    pub fn resource_ids(&self) -> ResourceIds {
        ResourceIds {
            user_ids: vec![self.sender_user_id],
            ..Default::default()
        }
    }

    pub fn format_for_email(&self, resources: &EmailResources) -> Option<serde_json::Value> {
        let sender = resources.users.get(&self.sender_user_id)?;
        let text = if self.multiple {
            format!("{} reacted to your messages", sender.display_name())
        } else {
            format!("{} reacted to your message", sender.display_name())
        };
        Some(json!({
            "type": "message_reaction",
            "users": [{
                "userId": sender.user_id,
                "handle": sender.handle,
                "name": sender.name,
            }],
            "multiple": self.multiple,
            "text": text,
        }))
    }
}
