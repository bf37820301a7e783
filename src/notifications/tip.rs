use serde::Deserialize;
use serde_json::json;

use crate::db::models::{NotificationCategory, NotificationEvent};
use crate::error::AppResult;

use super::format::format_audio;
use super::{
    deliver_to_receiver, find_user, parse_data, DispatchContext, EmailResources, ResourceIds,
};

#[derive(Debug, Clone, Deserialize)]
struct TipData {
    amount: String,
    sender_user_id: i32,
    receiver_user_id: i32,
}

/// Confirmation to the sender that their tip went through.
#[derive(Debug, Clone)]
pub struct TipSend {
    pub amount: String,
    pub sender_user_id: i32,
    pub tipped_user_id: i32,
}

impl TipSend {
    pub fn from_event(event: &NotificationEvent) -> Option<Self> {
        let data: TipData = parse_data(event)?;
        // The push goes to the tip's sender, not `user_ids[0]`.
        Some(TipSend {
            amount: data.amount,
            sender_user_id: data.sender_user_id,
            tipped_user_id: data.receiver_user_id,
        })
    }

    pub async fn dispatch(&self, ctx: &DispatchContext) -> AppResult<()> {
        let users = ctx
            .discovery
            .users_by_ids(&[self.sender_user_id, self.tipped_user_id])
            .await?;
        let sender = match find_user(&users, self.sender_user_id) {
            Some(u) => u,
            None => return Ok(()),
        };
        let tipped = match find_user(&users, self.tipped_user_id) {
            Some(u) => u,
            None => return Ok(()),
        };

        let amount = format_audio(&self.amount);
        let body = format!(
            "You successfully sent a tip of {} $AUDIO to {}",
            amount,
            tipped.display_name()
        );
        let email_entry = json!({
            "type": "tip_send",
            "users": [{
                "userId": tipped.user_id,
                "handle": tipped.handle,
                "name": tipped.name,
            }],
            "amount": amount,
            "text": body,
        });

        deliver_to_receiver(
            ctx,
            sender,
            Some(self.tipped_user_id),
            NotificationCategory::Tips,
            "Your Tip Was Sent!",
            &body,
            json!({"type": "tip_send"}),
            Some(email_entry),
        )
        .await
    }

    pub fn resource_ids(&self) -> ResourceIds {
        ResourceIds {
            user_ids: vec![self.tipped_user_id],
            ..Default::default()
        }
    }

    pub fn format_for_email(&self, resources: &EmailResources) -> Option<serde_json::Value> {
        let tipped = resources.users.get(&self.tipped_user_id)?;
        let amount = format_audio(&self.amount);
        Some(json!({
            "type": "tip_send",
            "users": [{
                "userId": tipped.user_id,
                "handle": tipped.handle,
                "name": tipped.name,
            }],
            "amount": amount,
            "text": format!(
                "You successfully sent a tip of {} $AUDIO to {}",
                amount,
                tipped.display_name()
            ),
        }))
    }
}

/// A tip landed in the receiver's wallet.
#[derive(Debug, Clone)]
pub struct TipReceive {
    pub amount: String,
    pub sender_user_id: i32,
    pub receiver_user_id: i32,
}

impl TipReceive {
    pub fn from_event(event: &NotificationEvent) -> Option<Self> {
        let data: TipData = parse_data(event)?;
        let receiver_user_id = event
            .user_ids
            .first()
            .copied()
            .unwrap_or(data.receiver_user_id);
        Some(TipReceive {
            amount: data.amount,
            sender_user_id: data.sender_user_id,
            receiver_user_id,
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

        let amount = format_audio(&self.amount);
        let body = format!(
            "{} sent you a tip of {} $AUDIO",
            sender.display_name(),
            amount
        );
        let email_entry = json!({
            "type": "tip_receive",
            "users": [{
                "userId": sender.user_id,
                "handle": sender.handle,
                "name": sender.name,
            }],
            "amount": amount,
            "text": body,
        });

        deliver_to_receiver(
            ctx,
            receiver,
            Some(self.sender_user_id),
            NotificationCategory::Tips,
            "You Received a Tip!",
            &body,
            json!({"type": "tip_receive"}),
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
        let amount = format_audio(&self.amount);
        Some(json!({
            "type": "tip_receive",
            "users": [{
                "userId": sender.user_id,
                "handle": sender.handle,
                "name": sender.name,
            }],
            "amount": amount,
            "text": format!("{} sent you a tip of {} $AUDIO", sender.display_name(), amount),
        }))
    }
}
