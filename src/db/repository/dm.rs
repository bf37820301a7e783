use chrono::NaiveDateTime;
use sqlx::PgPool;

use crate::db::models::DmEvent;
use crate::error::{AppError, AppResult};

// ============================================================================
// Direct Message Repository (discovery store)
// ============================================================================
//
// Unread = the receiving member has not touched the chat since the event was
// created (`last_active_at` is NULL or older). Both queries are window-bounded
// on `created_at` and serve the DM poll task and the email aggregation job.

pub struct DmRepository;

impl DmRepository {
    pub async fn unread_messages(
        pool: &PgPool,
        min: NaiveDateTime,
        max: NaiveDateTime,
    ) -> AppResult<Vec<DmEvent>> {
        sqlx::query_as::<_, DmEvent>(
            r#"
            SELECT
                chat_message.chat_id,
                chat_message.message_id,
                chat_message.user_id AS sender_user_id,
                chat_member.user_id AS receiver_user_id,
                chat_message.created_at
            FROM chat_message
            JOIN chat_member
              ON chat_member.chat_id = chat_message.chat_id
             AND chat_member.user_id != chat_message.user_id
            WHERE chat_message.created_at > $1
              AND chat_message.created_at <= $2
              AND (
                chat_member.last_active_at IS NULL
                OR chat_member.last_active_at < chat_message.created_at
              )
            "#,
        )
        .bind(min)
        .bind(max)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn unread_reactions(
        pool: &PgPool,
        min: NaiveDateTime,
        max: NaiveDateTime,
    ) -> AppResult<Vec<DmEvent>> {
        sqlx::query_as::<_, DmEvent>(
            r#"
            SELECT
                chat_message.chat_id,
                chat_message.message_id,
                chat_message_reactions.user_id AS sender_user_id,
                chat_message.user_id AS receiver_user_id,
                chat_message_reactions.created_at
            FROM chat_message_reactions
            JOIN chat_message
              ON chat_message.message_id = chat_message_reactions.message_id
            JOIN chat_member
              ON chat_member.chat_id = chat_message.chat_id
             AND chat_member.user_id = chat_message.user_id
            WHERE chat_message_reactions.user_id != chat_message.user_id
              AND chat_message_reactions.created_at > $1
              AND chat_message_reactions.created_at <= $2
              AND (
                chat_member.last_active_at IS NULL
                OR chat_member.last_active_at < chat_message_reactions.created_at
              )
            "#,
        )
        .bind(min)
        .bind(max)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)
    }
}
