use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An unread direct-message or message-reaction event, as returned by the
/// chat queries. One row per (message, receiving member) pair.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DmEvent {
    pub chat_id: String,
    pub message_id: String,
    pub sender_user_id: i32,
    pub receiver_user_id: i32,
    pub created_at: NaiveDateTime,
}
