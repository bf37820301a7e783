use serde::Deserialize;
use serde_json::json;

use crate::db::models::{NotificationCategory, NotificationEvent};
use crate::error::AppResult;

use super::format::format_audio;
use super::{
    deliver_to_receiver, find_user, parse_data, primary_receiver, DispatchContext, EmailResources,
    ResourceIds,
};

#[derive(Debug, Clone, Deserialize)]
struct ReactionData {
    reacted_to: String,
    reaction_type: String,
    reaction_value: i32,
    sender_user_id: i32,
    #[serde(default)]
    tip_amount: Option<String>,
}

/// Someone reacted to a tip the receiver sent.
#[derive(Debug, Clone)]
pub struct Reaction {
    pub reacted_to: String,
    pub reaction_type: String,
    pub reaction_value: i32,
    pub sender_user_id: i32,
    pub receiver_user_id: i32,
    pub tip_amount: Option<String>,
}

impl Reaction {
    pub fn from_event(event: &NotificationEvent) -> Option<Self> {
        let data: ReactionData = parse_data(event)?;
        let receiver_user_id = primary_receiver(event)?;
        Some(Reaction {
            reacted_to: data.reacted_to,
            reaction_type: data.reaction_type,
            reaction_value: data.reaction_value,
            sender_user_id: data.sender_user_id,
            receiver_user_id,
            tip_amount: data.tip_amount,
        })
    }

    /// No templated copy when the reaction is not tied to a tip amount; the
    /// body is legitimately empty in that case.
    fn body(&self, sender_name: &str) -> String {
        match self.tip_amount.as_deref() {
            Some(amount) => format!(
                "{} reacted to your tip of {} $AUDIO",
                sender_name,
                format_audio(amount)
            ),
            None => String::new(),
        }
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

        let body = self.body(sender.display_name());
        let email_entry = json!({
            "type": "reaction",
            "users": [{
                "userId": sender.user_id,
                "handle": sender.handle,
                "name": sender.name,
            }],
            "reactionType": self.reaction_type,
            "reactionValue": self.reaction_value,
            "reactedTo": self.reacted_to,
            "text": body,
        });

        deliver_to_receiver(
            ctx,
            receiver,
            Some(self.sender_user_id),
            NotificationCategory::Tips,
            &format!("{} reacted", sender.display_name()),
            &body,
            json!({"type": "reaction", "reactedTo": self.reacted_to}),
            Some(email_entry),
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
        Some(json!({
            "type": "reaction",
            "users": [{
                "userId": sender.user_id,
                "handle": sender.handle,
                "name": sender.name,
            }],
            "reactionType": self.reaction_type,
            "reactionValue": self.reaction_value,
            "reactedTo": self.reacted_to,
            "text": self.body(sender.display_name()),
        }))
    }
}
