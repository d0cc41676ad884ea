#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use beacon_core::audience::Audience;
use beacon_core::clock::{Clock, ManualClock};
use beacon_core::types::{ClaimToken, DbId, LocalTimestamp, TenantId};
use beacon_db::models::delivery::DeliveryRecord;
use beacon_db::models::device_token::{
    DeviceToken, RegisterToken, TokenCleanup, TokenStats, TokenUpsert,
};
use beacon_db::models::notification::{
    CreateNotification, NewNotification, Notification, NotificationStats,
};
use beacon_db::{DeliveryStore, MemoryStore, NotificationStore, Store, TokenStore};
use beacon_push::{NotificationService, PushError, PushPayload, PushSender, SchedulerConfig};
use chrono::NaiveDate;
use parking_lot::Mutex;
use uuid::Uuid;

pub fn t0() -> LocalTimestamp {
    NaiveDate::from_ymd_opt(2025, 6, 2)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
}

/// Format a timestamp the way a `datetime-local` field with seconds does.
pub fn local_input(at: LocalTimestamp) -> String {
    at.format("%Y-%m-%dT%H:%M:%S").to_string()
}

// ---------------------------------------------------------------------------
// Recording sender
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub enum SendMode {
    InvalidToken,
    Transient,
    Other,
    /// Never completes within any reasonable timeout.
    Hang,
}

/// A [`PushSender`] that records every send and can be told to fail or
/// stall for specific tokens.
#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<(String, PushPayload)>>,
    modes: Mutex<HashMap<String, SendMode>>,
    delay: Mutex<Option<Duration>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_mode(&self, token: &str, mode: SendMode) {
        self.modes.lock().insert(token.to_string(), mode);
    }

    /// Make every send sleep before completing.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub fn sent(&self) -> Vec<(String, PushPayload)> {
        self.sent.lock().clone()
    }

    pub fn sent_tokens(&self) -> Vec<String> {
        let mut tokens: Vec<String> = self.sent.lock().iter().map(|(t, _)| t.clone()).collect();
        tokens.sort();
        tokens
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PushSender for RecordingSender {
    async fn send(&self, token: &str, payload: &PushPayload) -> Result<(), PushError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mode = self.modes.lock().get(token).copied();
        if let Some(SendMode::Hang) = mode {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        match mode {
            Some(SendMode::InvalidToken) => Err(PushError::InvalidToken("unregistered".into())),
            Some(SendMode::Transient) => Err(PushError::Transient("HTTP 503".into())),
            Some(SendMode::Other) => Err(PushError::Other("HTTP 401".into())),
            Some(SendMode::Hang) | None => {
                self.sent.lock().push((token.to_string(), payload.clone()));
                Ok(())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Failing store
// ---------------------------------------------------------------------------

/// Delegates to a [`MemoryStore`], but audience lookups for one tenant fail
/// while `failing` is set, and delivery recording fails while
/// `failing_deliveries` is set.
pub struct FailingStore {
    pub inner: MemoryStore,
    pub failing_tenant: TenantId,
    pub failing: AtomicBool,
    pub failing_deliveries: AtomicBool,
}

impl FailingStore {
    pub fn new(failing_tenant: TenantId) -> Self {
        Self {
            inner: MemoryStore::new(),
            failing_tenant,
            failing: AtomicBool::new(true),
            failing_deliveries: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl TokenStore for FailingStore {
    async fn upsert_token(
        &self,
        tenant_id: TenantId,
        input: &TokenUpsert<'_>,
        now: LocalTimestamp,
    ) -> Result<DeviceToken, sqlx::Error> {
        self.inner.upsert_token(tenant_id, input, now).await
    }

    async fn find_by_audience(
        &self,
        tenant_id: TenantId,
        audience: Audience,
    ) -> Result<Vec<DeviceToken>, sqlx::Error> {
        if tenant_id == self.failing_tenant && self.failing.load(Ordering::SeqCst) {
            return Err(sqlx::Error::PoolTimedOut);
        }
        self.inner.find_by_audience(tenant_id, audience).await
    }

    async fn find_inconsistent_tokens(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<DeviceToken>, sqlx::Error> {
        self.inner.find_inconsistent_tokens(tenant_id).await
    }

    async fn token_stats(&self, tenant_id: TenantId) -> Result<TokenStats, sqlx::Error> {
        self.inner.token_stats(tenant_id).await
    }

    async fn cleanup_tokens(&self, tenant_id: TenantId) -> Result<TokenCleanup, sqlx::Error> {
        self.inner.cleanup_tokens(tenant_id).await
    }
}

#[async_trait]
impl NotificationStore for FailingStore {
    async fn insert_notification(
        &self,
        input: &NewNotification,
    ) -> Result<Notification, sqlx::Error> {
        self.inner.insert_notification(input).await
    }

    async fn find_notification(
        &self,
        tenant_id: TenantId,
        id: DbId,
    ) -> Result<Option<Notification>, sqlx::Error> {
        self.inner.find_notification(tenant_id, id).await
    }

    async fn list_notifications(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        self.inner.list_notifications(tenant_id).await
    }

    async fn list_due(
        &self,
        tenant_id: Option<TenantId>,
        as_of: LocalTimestamp,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        self.inner.list_due(tenant_id, as_of).await
    }

    async fn claim_for_dispatch(
        &self,
        id: DbId,
        claim: ClaimToken,
        now: LocalTimestamp,
        lease_until: LocalTimestamp,
    ) -> Result<bool, sqlx::Error> {
        self.inner.claim_for_dispatch(id, claim, now, lease_until).await
    }

    async fn extend_claim(
        &self,
        id: DbId,
        claim: ClaimToken,
        lease_until: LocalTimestamp,
    ) -> Result<bool, sqlx::Error> {
        self.inner.extend_claim(id, claim, lease_until).await
    }

    async fn release_claim(&self, id: DbId, claim: ClaimToken) -> Result<(), sqlx::Error> {
        self.inner.release_claim(id, claim).await
    }

    async fn mark_sent(
        &self,
        id: DbId,
        claim: ClaimToken,
        sent_at: LocalTimestamp,
    ) -> Result<bool, sqlx::Error> {
        self.inner.mark_sent(id, claim, sent_at).await
    }

    async fn notification_stats(
        &self,
        tenant_id: TenantId,
        as_of: LocalTimestamp,
    ) -> Result<NotificationStats, sqlx::Error> {
        self.inner.notification_stats(tenant_id, as_of).await
    }

    async fn delete_notification(
        &self,
        tenant_id: TenantId,
        id: DbId,
    ) -> Result<bool, sqlx::Error> {
        self.inner.delete_notification(tenant_id, id).await
    }
}

#[async_trait]
impl DeliveryStore for FailingStore {
    async fn pending_for(
        &self,
        tenant_id: TenantId,
        user_id: &str,
        since: LocalTimestamp,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        self.inner.pending_for(tenant_id, user_id, since).await
    }

    async fn mark_delivered(
        &self,
        notification_id: DbId,
        user_id: &str,
        at: LocalTimestamp,
    ) -> Result<bool, sqlx::Error> {
        self.inner.mark_delivered(notification_id, user_id, at).await
    }

    async fn record_deliveries(
        &self,
        user_id: &str,
        notification_ids: &[DbId],
        at: LocalTimestamp,
    ) -> Result<u64, sqlx::Error> {
        if self.failing_deliveries.load(Ordering::SeqCst) {
            return Err(sqlx::Error::PoolTimedOut);
        }
        self.inner.record_deliveries(user_id, notification_ids, at).await
    }

    async fn mark_read(
        &self,
        notification_id: DbId,
        user_id: &str,
        at: LocalTimestamp,
    ) -> Result<bool, sqlx::Error> {
        self.inner.mark_read(notification_id, user_id, at).await
    }

    async fn list_deliveries(
        &self,
        notification_id: DbId,
    ) -> Result<Vec<DeliveryRecord>, sqlx::Error> {
        self.inner.list_deliveries(notification_id).await
    }
}

#[async_trait]
impl Store for FailingStore {
    async fn ping(&self) -> Result<(), sqlx::Error> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness<S> {
    pub store: Arc<S>,
    pub sender: Arc<RecordingSender>,
    pub clock: ManualClock,
    pub service: Arc<NotificationService>,
}

pub fn harness() -> Harness<MemoryStore> {
    harness_with(MemoryStore::new())
}

pub fn harness_with<S: Store + 'static>(store: S) -> Harness<S> {
    harness_with_config(store, SchedulerConfig::default())
}

pub fn harness_with_config<S: Store + 'static>(store: S, config: SchedulerConfig) -> Harness<S> {
    let store = Arc::new(store);
    let sender = Arc::new(RecordingSender::new());
    let clock = ManualClock::new(t0());
    let service = Arc::new(NotificationService::new(
        store.clone() as Arc<dyn Store>,
        sender.clone() as Arc<dyn PushSender>,
        Arc::new(clock.clone()) as Arc<dyn Clock>,
        config,
    ));
    Harness {
        store,
        sender,
        clock,
        service,
    }
}

pub fn tenant() -> TenantId {
    Uuid::new_v4()
}

pub fn registration(token: &str, device: &str, user: Option<&str>) -> RegisterToken {
    RegisterToken {
        token: token.to_string(),
        device_id: device.to_string(),
        platform: "android".to_string(),
        user_id: user.map(str::to_string),
        user_email: user.map(|u| format!("{u}@example.com")),
    }
}

pub fn notification(
    title: &str,
    target: &str,
    scheduled_time: Option<LocalTimestamp>,
) -> CreateNotification {
    CreateNotification {
        title: title.to_string(),
        body: format!("{title} body"),
        notification_type: None,
        target: Some(target.to_string()),
        scheduled_time: scheduled_time.map(local_input),
    }
}
