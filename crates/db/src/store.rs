//! Store traits the notification engine depends on.
//!
//! The scheduler, the creation path and the HTTP layer all talk to these
//! traits rather than to a concrete connection, so the Postgres
//! implementation ([`PgStore`]) and the in-process one
//! ([`MemoryStore`](crate::memory::MemoryStore)) are interchangeable.

use async_trait::async_trait;
use beacon_core::audience::Audience;
use beacon_core::types::{ClaimToken, DbId, LocalTimestamp, TenantId};

use crate::models::delivery::DeliveryRecord;
use crate::models::device_token::{DeviceToken, TokenCleanup, TokenStats, TokenUpsert};
use crate::models::notification::{NewNotification, Notification, NotificationStats};
use crate::repositories::{DeliveryRepo, DeviceTokenRepo, NotificationRepo};
use crate::DbPool;

/// Device token registry.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn upsert_token(
        &self,
        tenant_id: TenantId,
        input: &TokenUpsert<'_>,
        now: LocalTimestamp,
    ) -> Result<DeviceToken, sqlx::Error>;

    async fn find_by_audience(
        &self,
        tenant_id: TenantId,
        audience: Audience,
    ) -> Result<Vec<DeviceToken>, sqlx::Error>;

    async fn find_inconsistent_tokens(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<DeviceToken>, sqlx::Error>;

    async fn token_stats(&self, tenant_id: TenantId) -> Result<TokenStats, sqlx::Error>;

    async fn cleanup_tokens(&self, tenant_id: TenantId) -> Result<TokenCleanup, sqlx::Error>;
}

/// Durable notification records and their status transitions.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert_notification(
        &self,
        input: &NewNotification,
    ) -> Result<Notification, sqlx::Error>;

    async fn find_notification(
        &self,
        tenant_id: TenantId,
        id: DbId,
    ) -> Result<Option<Notification>, sqlx::Error>;

    async fn list_notifications(&self, tenant_id: TenantId)
        -> Result<Vec<Notification>, sqlx::Error>;

    /// Scheduled rows due at `as_of`, including those with no time; `None`
    /// scans every tenant.
    async fn list_due(
        &self,
        tenant_id: Option<TenantId>,
        as_of: LocalTimestamp,
    ) -> Result<Vec<Notification>, sqlx::Error>;

    /// Take the dispatch claim for `claim`; `false` while another holder's
    /// lease runs or once the row is sent.
    async fn claim_for_dispatch(
        &self,
        id: DbId,
        claim: ClaimToken,
        now: LocalTimestamp,
        lease_until: LocalTimestamp,
    ) -> Result<bool, sqlx::Error>;

    /// Push the lease end of a claim `claim` still holds.
    async fn extend_claim(
        &self,
        id: DbId,
        claim: ClaimToken,
        lease_until: LocalTimestamp,
    ) -> Result<bool, sqlx::Error>;

    async fn release_claim(&self, id: DbId, claim: ClaimToken) -> Result<(), sqlx::Error>;

    /// Conditional `scheduled -> sent` by the claim holder; `false` when the
    /// row is already sent or the claim was lost.
    async fn mark_sent(
        &self,
        id: DbId,
        claim: ClaimToken,
        sent_at: LocalTimestamp,
    ) -> Result<bool, sqlx::Error>;

    async fn notification_stats(
        &self,
        tenant_id: TenantId,
        as_of: LocalTimestamp,
    ) -> Result<NotificationStats, sqlx::Error>;

    async fn delete_notification(&self, tenant_id: TenantId, id: DbId)
        -> Result<bool, sqlx::Error>;
}

/// Per-(notification, user) delivery ledger.
#[async_trait]
pub trait DeliveryStore: Send + Sync {
    async fn pending_for(
        &self,
        tenant_id: TenantId,
        user_id: &str,
        since: LocalTimestamp,
    ) -> Result<Vec<Notification>, sqlx::Error>;

    /// Insert-or-ignore; `true` only when a new record was written.
    async fn mark_delivered(
        &self,
        notification_id: DbId,
        user_id: &str,
        at: LocalTimestamp,
    ) -> Result<bool, sqlx::Error>;

    /// Insert-or-ignore a delivery for each id, all or nothing. Missing ids
    /// are skipped. Returns the number of new records.
    async fn record_deliveries(
        &self,
        user_id: &str,
        notification_ids: &[DbId],
        at: LocalTimestamp,
    ) -> Result<u64, sqlx::Error>;

    async fn mark_read(
        &self,
        notification_id: DbId,
        user_id: &str,
        at: LocalTimestamp,
    ) -> Result<bool, sqlx::Error>;

    async fn list_deliveries(
        &self,
        notification_id: DbId,
    ) -> Result<Vec<DeliveryRecord>, sqlx::Error>;
}

/// Everything the engine needs from persistence, plus a liveness probe.
#[async_trait]
pub trait Store: TokenStore + NotificationStore + DeliveryStore {
    async fn ping(&self) -> Result<(), sqlx::Error>;
}

// ---------------------------------------------------------------------------
// PgStore
// ---------------------------------------------------------------------------

/// [`Store`] over a Postgres pool, delegating to the repositories.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl TokenStore for PgStore {
    async fn upsert_token(
        &self,
        tenant_id: TenantId,
        input: &TokenUpsert<'_>,
        now: LocalTimestamp,
    ) -> Result<DeviceToken, sqlx::Error> {
        DeviceTokenRepo::upsert(&self.pool, tenant_id, input, now).await
    }

    async fn find_by_audience(
        &self,
        tenant_id: TenantId,
        audience: Audience,
    ) -> Result<Vec<DeviceToken>, sqlx::Error> {
        DeviceTokenRepo::find_by_audience(&self.pool, tenant_id, audience).await
    }

    async fn find_inconsistent_tokens(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<DeviceToken>, sqlx::Error> {
        DeviceTokenRepo::find_inconsistent(&self.pool, tenant_id).await
    }

    async fn token_stats(&self, tenant_id: TenantId) -> Result<TokenStats, sqlx::Error> {
        DeviceTokenRepo::stats(&self.pool, tenant_id).await
    }

    async fn cleanup_tokens(&self, tenant_id: TenantId) -> Result<TokenCleanup, sqlx::Error> {
        DeviceTokenRepo::cleanup(&self.pool, tenant_id).await
    }
}

#[async_trait]
impl NotificationStore for PgStore {
    async fn insert_notification(
        &self,
        input: &NewNotification,
    ) -> Result<Notification, sqlx::Error> {
        NotificationRepo::create(&self.pool, input).await
    }

    async fn find_notification(
        &self,
        tenant_id: TenantId,
        id: DbId,
    ) -> Result<Option<Notification>, sqlx::Error> {
        NotificationRepo::find_by_id(&self.pool, tenant_id, id).await
    }

    async fn list_notifications(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        NotificationRepo::list_for_tenant(&self.pool, tenant_id).await
    }

    async fn list_due(
        &self,
        tenant_id: Option<TenantId>,
        as_of: LocalTimestamp,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        NotificationRepo::list_due(&self.pool, tenant_id, as_of).await
    }

    async fn claim_for_dispatch(
        &self,
        id: DbId,
        claim: ClaimToken,
        now: LocalTimestamp,
        lease_until: LocalTimestamp,
    ) -> Result<bool, sqlx::Error> {
        NotificationRepo::claim(&self.pool, id, claim, now, lease_until).await
    }

    async fn extend_claim(
        &self,
        id: DbId,
        claim: ClaimToken,
        lease_until: LocalTimestamp,
    ) -> Result<bool, sqlx::Error> {
        NotificationRepo::extend_claim(&self.pool, id, claim, lease_until).await
    }

    async fn release_claim(&self, id: DbId, claim: ClaimToken) -> Result<(), sqlx::Error> {
        NotificationRepo::release_claim(&self.pool, id, claim).await
    }

    async fn mark_sent(
        &self,
        id: DbId,
        claim: ClaimToken,
        sent_at: LocalTimestamp,
    ) -> Result<bool, sqlx::Error> {
        NotificationRepo::mark_sent(&self.pool, id, claim, sent_at).await
    }

    async fn notification_stats(
        &self,
        tenant_id: TenantId,
        as_of: LocalTimestamp,
    ) -> Result<NotificationStats, sqlx::Error> {
        NotificationRepo::stats(&self.pool, tenant_id, as_of).await
    }

    async fn delete_notification(
        &self,
        tenant_id: TenantId,
        id: DbId,
    ) -> Result<bool, sqlx::Error> {
        NotificationRepo::delete(&self.pool, tenant_id, id).await
    }
}

#[async_trait]
impl DeliveryStore for PgStore {
    async fn pending_for(
        &self,
        tenant_id: TenantId,
        user_id: &str,
        since: LocalTimestamp,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        DeliveryRepo::pending_for(&self.pool, tenant_id, user_id, since).await
    }

    async fn mark_delivered(
        &self,
        notification_id: DbId,
        user_id: &str,
        at: LocalTimestamp,
    ) -> Result<bool, sqlx::Error> {
        DeliveryRepo::mark_delivered(&self.pool, notification_id, user_id, at).await
    }

    async fn record_deliveries(
        &self,
        user_id: &str,
        notification_ids: &[DbId],
        at: LocalTimestamp,
    ) -> Result<u64, sqlx::Error> {
        DeliveryRepo::record_many(&self.pool, user_id, notification_ids, at).await
    }

    async fn mark_read(
        &self,
        notification_id: DbId,
        user_id: &str,
        at: LocalTimestamp,
    ) -> Result<bool, sqlx::Error> {
        DeliveryRepo::mark_read(&self.pool, notification_id, user_id, at).await
    }

    async fn list_deliveries(
        &self,
        notification_id: DbId,
    ) -> Result<Vec<DeliveryRecord>, sqlx::Error> {
        DeliveryRepo::list_for_notification(&self.pool, notification_id).await
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), sqlx::Error> {
        crate::health_check(&self.pool).await
    }
}
