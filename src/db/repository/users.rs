use sqlx::PgPool;

use crate::db::models::User;
use crate::error::{AppError, AppResult};

// ============================================================================
// User Repository (discovery store)
// ============================================================================

pub struct UserRepository;

impl UserRepository {
    pub async fn find_by_ids(pool: &PgPool, ids: &[i32]) -> AppResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, handle, name, is_deactivated
            FROM users
            WHERE user_id = ANY($1) AND is_current = TRUE
            "#,
        )
        .bind(ids)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)
    }
}
