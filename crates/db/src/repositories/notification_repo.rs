//! Repository for the `notifications` table.

use beacon_core::lifecycle::{STATUS_SCHEDULED, STATUS_SENT};
use beacon_core::types::{ClaimToken, DbId, LocalTimestamp, TenantId};
use sqlx::PgPool;

use crate::models::notification::{NewNotification, Notification, NotificationStats};

/// Column list for `notifications` queries.
pub(crate) const COLUMNS: &str = "id, tenant_id, title, body, notification_type, target, \
                                  scheduled_time, status, created_at, sent_at";

/// Provides lifecycle operations for notifications.
pub struct NotificationRepo;

impl NotificationRepo {
    /// Insert a notification, returning the stored row.
    pub async fn create(pool: &PgPool, input: &NewNotification) -> Result<Notification, sqlx::Error> {
        let query = format!(
            "INSERT INTO notifications \
                (tenant_id, title, body, notification_type, target, scheduled_time, \
                 status, created_at, sent_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(input.tenant_id)
            .bind(&input.title)
            .bind(&input.body)
            .bind(&input.notification_type)
            .bind(input.target.as_str())
            .bind(input.scheduled_time)
            .bind(input.status.as_str())
            .bind(input.created_at)
            .bind(input.sent_at)
            .fetch_one(pool)
            .await
    }

    /// Find a notification by ID within a tenant.
    pub async fn find_by_id(
        pool: &PgPool,
        tenant_id: TenantId,
        id: DbId,
    ) -> Result<Option<Notification>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM notifications WHERE tenant_id = $1 AND id = $2");
        sqlx::query_as::<_, Notification>(&query)
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a tenant's notifications, newest first.
    pub async fn list_for_tenant(
        pool: &PgPool,
        tenant_id: TenantId,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notifications \
             WHERE tenant_id = $1 \
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(tenant_id)
            .fetch_all(pool)
            .await
    }

    /// List scheduled notifications whose time is at or before `as_of`.
    ///
    /// A scheduled row with no time is an immediate send that has not been
    /// marked sent yet, and is always due. `tenant_id = None` scans every
    /// tenant, which is what the sweep does.
    pub async fn list_due(
        pool: &PgPool,
        tenant_id: Option<TenantId>,
        as_of: LocalTimestamp,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notifications \
             WHERE status = $1 AND (scheduled_time IS NULL OR scheduled_time <= $2) \
               AND ($3::uuid IS NULL OR tenant_id = $3) \
             ORDER BY scheduled_time NULLS FIRST, id"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(STATUS_SCHEDULED)
            .bind(as_of)
            .bind(tenant_id)
            .fetch_all(pool)
            .await
    }

    /// Take the dispatch claim on a scheduled notification for `claim` until
    /// `lease_until`.
    ///
    /// Returns `false` if the row is already sent or another dispatcher holds
    /// an unexpired claim.
    pub async fn claim(
        pool: &PgPool,
        id: DbId,
        claim: ClaimToken,
        now: LocalTimestamp,
        lease_until: LocalTimestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications SET claim_owner = $2, claimed_until = $4 \
             WHERE id = $1 AND status = $5 \
               AND (claimed_until IS NULL OR claimed_until < $3)",
        )
        .bind(id)
        .bind(claim)
        .bind(now)
        .bind(lease_until)
        .bind(STATUS_SCHEDULED)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Move the lease end of a claim `claim` still holds.
    ///
    /// Returns `false` when the claim has been taken over or the row is no
    /// longer scheduled.
    pub async fn extend_claim(
        pool: &PgPool,
        id: DbId,
        claim: ClaimToken,
        lease_until: LocalTimestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications SET claimed_until = $3 \
             WHERE id = $1 AND claim_owner = $2 AND status = $4",
        )
        .bind(id)
        .bind(claim)
        .bind(lease_until)
        .bind(STATUS_SCHEDULED)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Drop the dispatch claim so the next sweep can retry the row.
    pub async fn release_claim(
        pool: &PgPool,
        id: DbId,
        claim: ClaimToken,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE notifications SET claim_owner = NULL, claimed_until = NULL \
             WHERE id = $1 AND claim_owner = $2 AND status = $3",
        )
        .bind(id)
        .bind(claim)
        .bind(STATUS_SCHEDULED)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Flip a scheduled notification to sent.
    ///
    /// Conditional on `status = 'scheduled'` and on `claim` still owning the
    /// row: returns `false` and writes nothing otherwise.
    pub async fn mark_sent(
        pool: &PgPool,
        id: DbId,
        claim: ClaimToken,
        sent_at: LocalTimestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications \
             SET status = $4, sent_at = $3, claim_owner = NULL, claimed_until = NULL \
             WHERE id = $1 AND claim_owner = $2 AND status = $5",
        )
        .bind(id)
        .bind(claim)
        .bind(sent_at)
        .bind(STATUS_SENT)
        .bind(STATUS_SCHEDULED)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count a tenant's notifications by status.
    pub async fn stats(
        pool: &PgPool,
        tenant_id: TenantId,
        as_of: LocalTimestamp,
    ) -> Result<NotificationStats, sqlx::Error> {
        sqlx::query_as::<_, NotificationStats>(
            "SELECT \
                COUNT(*) AS total, \
                COUNT(*) FILTER (WHERE status = $2) AS sent, \
                COUNT(*) FILTER (WHERE status = $3) AS scheduled, \
                COUNT(*) FILTER ( \
                    WHERE status = $3 AND (scheduled_time IS NULL OR scheduled_time <= $4) \
                ) AS due \
             FROM notifications WHERE tenant_id = $1",
        )
        .bind(tenant_id)
        .bind(STATUS_SENT)
        .bind(STATUS_SCHEDULED)
        .bind(as_of)
        .fetch_one(pool)
        .await
    }

    /// Delete a notification and, by cascade, its delivery records.
    ///
    /// Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, tenant_id: TenantId, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM notifications WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
