use sqlx::PgPool;

use crate::error::{AppError, AppResult};

// ============================================================================
// Cursor Repository (identity store)
// ============================================================================
//
// Key/value watermarks for the DM poll task. Each cursor advances
// monotonically after a successful pass.

pub struct CursorRepository;

impl CursorRepository {
    pub async fn get(pool: &PgPool, key: &str) -> AppResult<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT value FROM notification_cursors WHERE key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.map(|(value,)| value))
    }

    pub async fn set(pool: &PgPool, key: &str, value: &str) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO notification_cursors (key, value, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (key) DO UPDATE SET
                value = EXCLUDED.value,
                updated_at = NOW()
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(())
    }
}
