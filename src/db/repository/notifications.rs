use chrono::NaiveDateTime;
use sqlx::PgPool;

use crate::db::models::{NotificationEvent, NotificationRow};
use crate::error::{AppError, AppResult};

// ============================================================================
// Notification Repository (discovery store)
// ============================================================================

pub struct NotificationRepository;

impl NotificationRepository {
    /// Rows inserted in `(start, end]` whose kind is in `kinds`, ascending by
    /// insert time. Used by the email aggregation job, which bypasses the
    /// listener and reads the table directly.
    pub async fn find_in_window(
        pool: &PgPool,
        start: NaiveDateTime,
        end: NaiveDateTime,
        kinds: &[String],
    ) -> AppResult<Vec<NotificationEvent>> {
        if kinds.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, NotificationRow>(
            r#"
            SELECT id, type, timestamp, specifier, group_id, data, user_ids
            FROM notification
            WHERE timestamp > $1 AND timestamp <= $2 AND type = ANY($3)
            ORDER BY timestamp ASC
            "#,
        )
        .bind(start)
        .bind(end)
        .bind(kinds)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows.into_iter().map(NotificationEvent::from).collect())
    }
}
