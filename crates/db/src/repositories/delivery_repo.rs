//! Repository for the `notification_deliveries` table.

use beacon_core::audience::AUDIENCE_AUTHENTICATED;
use beacon_core::lifecycle::STATUS_SENT;
use beacon_core::types::{DbId, LocalTimestamp, TenantId};
use sqlx::PgPool;

use crate::models::delivery::DeliveryRecord;
use crate::models::notification::Notification;
use crate::repositories::notification_repo::COLUMNS as NOTIFICATION_COLUMNS;

/// Column list for `notification_deliveries` queries.
const COLUMNS: &str = "id, notification_id, user_id, delivered_at, read_at";

/// Provides the per-user delivery ledger.
pub struct DeliveryRepo;

impl DeliveryRepo {
    /// Sent `authenticated` notifications created at or after `since` that
    /// have no delivery record for `user_id`, newest first.
    pub async fn pending_for(
        pool: &PgPool,
        tenant_id: TenantId,
        user_id: &str,
        since: LocalTimestamp,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let query = format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
             WHERE tenant_id = $1 AND target = $3 AND status = $4 AND created_at >= $5 \
               AND NOT EXISTS ( \
                 SELECT 1 FROM notification_deliveries d \
                 WHERE d.notification_id = notifications.id AND d.user_id = $2 \
               ) \
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(tenant_id)
            .bind(user_id)
            .bind(AUDIENCE_AUTHENTICATED)
            .bind(STATUS_SENT)
            .bind(since)
            .fetch_all(pool)
            .await
    }

    /// Record that `user_id` has been shown `notification_id`.
    ///
    /// A second call for the same pair is a no-op. Returns `true` only when a
    /// new record was written.
    pub async fn mark_delivered(
        pool: &PgPool,
        notification_id: DbId,
        user_id: &str,
        at: LocalTimestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO notification_deliveries (notification_id, user_id, delivered_at) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (notification_id, user_id) DO NOTHING",
        )
        .bind(notification_id)
        .bind(user_id)
        .bind(at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record deliveries of every notification in `notification_ids` to
    /// `user_id` in one statement.
    ///
    /// Ids that no longer exist and pairs already recorded are skipped.
    /// Returns the number of new records.
    pub async fn record_many(
        pool: &PgPool,
        user_id: &str,
        notification_ids: &[DbId],
        at: LocalTimestamp,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO notification_deliveries (notification_id, user_id, delivered_at) \
             SELECT n.id, $2, $3 FROM notifications n WHERE n.id = ANY($1) \
             ON CONFLICT (notification_id, user_id) DO NOTHING",
        )
        .bind(notification_ids)
        .bind(user_id)
        .bind(at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Set `read_at` on an existing, unread record.
    pub async fn mark_read(
        pool: &PgPool,
        notification_id: DbId,
        user_id: &str,
        at: LocalTimestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notification_deliveries SET read_at = $3 \
             WHERE notification_id = $1 AND user_id = $2 AND read_at IS NULL",
        )
        .bind(notification_id)
        .bind(user_id)
        .bind(at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// All delivery records for one notification.
    pub async fn list_for_notification(
        pool: &PgPool,
        notification_id: DbId,
    ) -> Result<Vec<DeliveryRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notification_deliveries \
             WHERE notification_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, DeliveryRecord>(&query)
            .bind(notification_id)
            .fetch_all(pool)
            .await
    }
}
