use std::collections::HashMap;

use chrono::NaiveDateTime;
use sqlx::PgPool;

use crate::db::models::*;
use crate::error::{AppError, AppResult};

// ============================================================================
// Notification Settings Repository (identity store)
// ============================================================================

pub struct SettingsRepository;

impl SettingsRepository {
    /// Resolve the full settings bundle for a set of users with one query per
    /// table (settings, devices, badges, email), assembled in memory. Users
    /// with no rows fall back to defaults.
    pub async fn settings_for_users(pool: &PgPool, ids: &[i32]) -> AppResult<SettingsBundle> {
        if ids.is_empty() {
            return Ok(SettingsBundle::default());
        }

        let settings_rows = sqlx::query_as::<_, SettingsRow>(
            r#"
            SELECT user_id, followers, reposts, favorites, remixes,
                   milestones, messages, announcements, tips, is_abusive
            FROM user_notification_settings
            WHERE user_id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        let device_rows = sqlx::query_as::<_, DeviceRow>(
            r#"
            SELECT user_id, device_type, target_arn, enabled
            FROM user_push_devices
            WHERE user_id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        let badge_rows = sqlx::query_as::<_, BadgeRow>(
            r#"
            SELECT user_id, unread_count
            FROM user_badge_counts
            WHERE user_id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        let email_rows = sqlx::query_as::<_, EmailSettingsRow>(
            r#"
            SELECT user_id, email, frequency, is_deliverable
            FROM user_email_settings
            WHERE user_id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        let mut bundle = SettingsBundle::default();
        for &id in ids {
            bundle
                .by_user
                .insert(id, UserNotificationSettings::empty(id));
        }

        for row in settings_rows {
            if let Some(entry) = bundle.by_user.get_mut(&row.user_id) {
                entry.toggles = NotificationToggles {
                    followers: row.followers,
                    reposts: row.reposts,
                    favorites: row.favorites,
                    remixes: row.remixes,
                    milestones: row.milestones,
                    messages: row.messages,
                    announcements: row.announcements,
                    tips: row.tips,
                };
                entry.is_abusive = row.is_abusive;
            }
        }

        for row in device_rows {
            if let Some(entry) = bundle.by_user.get_mut(&row.user_id) {
                entry.devices.push(PushDevice {
                    device_type: row.device_type,
                    target_arn: row.target_arn,
                    enabled: row.enabled,
                });
            }
        }

        for row in badge_rows {
            if let Some(entry) = bundle.by_user.get_mut(&row.user_id) {
                entry.badge_count = row.unread_count;
            }
        }

        for row in email_rows {
            if let Some(entry) = bundle.by_user.get_mut(&row.user_id) {
                if row.is_deliverable {
                    entry.email = Some(row.email);
                }
                entry.email_frequency = EmailFrequency::from_str(&row.frequency);
            }
        }

        Ok(bundle)
    }

    /// Bump the receiver's unread badge by one. Upsert-with-increment so the
    /// two independent loops can both write without losing updates.
    pub async fn increment_badge(pool: &PgPool, user_id: i32) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_badge_counts (user_id, unread_count, updated_at)
            VALUES ($1, 1, NOW())
            ON CONFLICT (user_id) DO UPDATE SET
                unread_count = user_badge_counts.unread_count + 1,
                updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(())
    }

    /// One page of users eligible for a digest at `frequency`: email
    /// deliverable, matching cadence, and not emailed since `emailed_before`.
    /// Keyset-paged on ascending user id.
    pub async fn eligible_email_users(
        pool: &PgPool,
        frequency: EmailFrequency,
        emailed_before: NaiveDateTime,
        last_user_id: i32,
        limit: i64,
    ) -> AppResult<Vec<EmailUser>> {
        sqlx::query_as::<_, EmailUser>(
            r#"
            SELECT ues.user_id, ues.email
            FROM user_email_settings ues
            LEFT JOIN notification_email_history h ON h.user_id = ues.user_id
            WHERE ues.frequency = $1
              AND ues.is_deliverable = TRUE
              AND (h.last_sent_at IS NULL OR h.last_sent_at <= $2)
              AND ues.user_id > $3
            ORDER BY ues.user_id ASC
            LIMIT $4
            "#,
        )
        .bind(frequency.as_str())
        .bind(emailed_before)
        .bind(last_user_id)
        .bind(limit)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)
    }

    /// Record that a digest went out so the cooldown check suppresses a
    /// re-send of the same window next tick.
    pub async fn record_email_sent(
        pool: &PgPool,
        user_id: i32,
        frequency: EmailFrequency,
        sent_at: NaiveDateTime,
    ) -> AppResult<()> {
        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO notification_email_history (id, user_id, frequency, last_sent_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE SET
                frequency = EXCLUDED.frequency,
                last_sent_at = EXCLUDED.last_sent_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(frequency.as_str())
        .bind(sent_at)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(())
    }
}
