use serde::Deserialize;
use serde_json::json;

use crate::db::models::{NotificationCategory, NotificationEvent};
use crate::error::AppResult;

use super::format::format_usdc;
use super::{
    deliver_to_receiver, find_user, parse_data, primary_receiver, DispatchContext, EmailResources,
    ResourceIds,
};

#[derive(Debug, Clone, Deserialize)]
struct WithdrawalData {
    amount: String,
    #[serde(default)]
    receiver_account: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UsdcWithdrawal {
    pub amount: String,
    pub receiver_account: Option<String>,
    pub receiver_user_id: i32,
}

impl UsdcWithdrawal {
    pub fn from_event(event: &NotificationEvent) -> Option<Self> {
        let data: WithdrawalData = parse_data(event)?;
        let receiver_user_id = primary_receiver(event)?;
        Some(UsdcWithdrawal {
            amount: data.amount,
            receiver_account: data.receiver_account,
            receiver_user_id,
        })
    }

    pub async fn dispatch(&self, ctx: &DispatchContext) -> AppResult<()> {
        let users = ctx.discovery.users_by_ids(&[self.receiver_user_id]).await?;
        let receiver = match find_user(&users, self.receiver_user_id) {
            Some(u) => u,
            None => return Ok(()),
        };

        let body = format!(
            "You have successfully withdrawn ${}",
            format_usdc(&self.amount)
        );
        let email_entry = json!({
            "type": "usdc_withdrawal",
            "amount": format_usdc(&self.amount),
            "text": body,
        });

        deliver_to_receiver(
            ctx,
            receiver,
            None,
            NotificationCategory::Tips,
            "Withdrawal Complete",
            &body,
            json!({"type": "usdc_withdrawal"}),
            Some(email_entry),
        )
        .await
    }

    pub fn resource_ids(&self) -> ResourceIds {
        ResourceIds::default()
    }

    pub fn format_for_email(&self, _resources: &EmailResources) -> Option<serde_json::Value> {
        Some(json!({
            "type": "usdc_withdrawal",
            "amount": format_usdc(&self.amount),
            "text": format!(
                "You have successfully withdrawn ${}",
                format_usdc(&self.amount)
            ),
        }))
    }
}
