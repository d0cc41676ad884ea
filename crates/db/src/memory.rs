//! In-process [`Store`], used by the engine and HTTP tests in place of
//! Postgres.
//!
//! Every operation takes the single lock for its whole duration, so the
//! conditional updates (`claim_for_dispatch`, `mark_sent`,
//! `record_deliveries`) are atomic in the same way their SQL counterparts are.

use std::collections::HashMap;

use async_trait::async_trait;
use beacon_core::audience::Audience;
use beacon_core::lifecycle::NotificationStatus;
use beacon_core::types::{ClaimToken, DbId, LocalTimestamp, TenantId};
use parking_lot::Mutex;

use crate::models::delivery::DeliveryRecord;
use crate::models::device_token::{DeviceToken, TokenCleanup, TokenStats, TokenUpsert};
use crate::models::notification::{NewNotification, Notification, NotificationStats};
use crate::store::{DeliveryStore, NotificationStore, Store, TokenStore};

#[derive(Debug, Clone, Copy)]
struct Claim {
    owner: ClaimToken,
    until: LocalTimestamp,
}

#[derive(Debug, Clone)]
struct StoredNotification {
    row: Notification,
    claim: Option<Claim>,
}

impl StoredNotification {
    fn is_scheduled(&self) -> bool {
        self.row.status == NotificationStatus::Scheduled.as_str()
    }

    fn held_by(&self, owner: ClaimToken) -> bool {
        self.is_scheduled() && self.claim.is_some_and(|c| c.owner == owner)
    }
}

/// Scheduled with no time, or with a time at or before `as_of`.
fn is_due(row: &Notification, as_of: LocalTimestamp) -> bool {
    row.scheduled_time.map_or(true, |at| at <= as_of)
}

#[derive(Debug, Default)]
struct Inner {
    next_token_id: DbId,
    next_notification_id: DbId,
    next_delivery_id: DbId,
    tokens: Vec<DeviceToken>,
    notifications: Vec<StoredNotification>,
    deliveries: Vec<DeliveryRecord>,
}

impl Inner {
    fn next_id(counter: &mut DbId) -> DbId {
        *counter += 1;
        *counter
    }

    fn notification_mut(&mut self, id: DbId) -> Option<&mut StoredNotification> {
        self.notifications.iter_mut().find(|n| n.row.id == id)
    }
}

/// A [`Store`] kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a token row as-is, bypassing upsert normalization.
    ///
    /// Lets tests seed rows whose auth flag and user id disagree, which the
    /// registration path never produces. The `id` field is reassigned.
    pub fn insert_raw_token(&self, mut token: DeviceToken) -> DeviceToken {
        let mut inner = self.inner.lock();
        token.id = Inner::next_id(&mut inner.next_token_id);
        inner.tokens.push(token.clone());
        token
    }

    /// Every stored token of a tenant, in insertion order.
    pub fn tokens_for(&self, tenant_id: TenantId) -> Vec<DeviceToken> {
        self.inner
            .lock()
            .tokens
            .iter()
            .filter(|t| t.tenant_id == tenant_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn upsert_token(
        &self,
        tenant_id: TenantId,
        input: &TokenUpsert<'_>,
        now: LocalTimestamp,
    ) -> Result<DeviceToken, sqlx::Error> {
        let mut inner = self.inner.lock();

        if let Some(existing) = inner
            .tokens
            .iter_mut()
            .find(|t| t.tenant_id == tenant_id && t.token == input.token)
        {
            existing.user_id = input.user_id.map(str::to_owned);
            existing.user_email = input.user_email().map(str::to_owned);
            existing.is_authenticated = input.is_authenticated();
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let token = DeviceToken {
            id: Inner::next_id(&mut inner.next_token_id),
            tenant_id,
            token: input.token.to_owned(),
            device_id: Some(input.device_id.to_owned()),
            platform: input.platform.to_owned(),
            user_id: input.user_id.map(str::to_owned),
            user_email: input.user_email().map(str::to_owned),
            is_authenticated: input.is_authenticated(),
            created_at: now,
            updated_at: now,
        };
        inner.tokens.push(token.clone());
        Ok(token)
    }

    async fn find_by_audience(
        &self,
        tenant_id: TenantId,
        audience: Audience,
    ) -> Result<Vec<DeviceToken>, sqlx::Error> {
        Ok(self
            .inner
            .lock()
            .tokens
            .iter()
            .filter(|t| {
                t.tenant_id == tenant_id
                    && audience.includes(t.is_authenticated, t.user_id.as_deref())
            })
            .cloned()
            .collect())
    }

    async fn find_inconsistent_tokens(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<DeviceToken>, sqlx::Error> {
        Ok(self
            .inner
            .lock()
            .tokens
            .iter()
            .filter(|t| t.tenant_id == tenant_id && t.is_inconsistent())
            .cloned()
            .collect())
    }

    async fn token_stats(&self, tenant_id: TenantId) -> Result<TokenStats, sqlx::Error> {
        let inner = self.inner.lock();
        let mut stats = TokenStats::default();
        let mut devices = std::collections::HashSet::new();

        for t in inner.tokens.iter().filter(|t| t.tenant_id == tenant_id) {
            stats.total += 1;
            if t.is_authenticated_user() {
                stats.authenticated += 1;
            }
            if t.is_guest() {
                stats.guests += 1;
            }
            if t.is_inconsistent() {
                stats.inconsistent += 1;
            }
            if let Some(device) = &t.device_id {
                devices.insert(device.as_str());
            }
        }
        stats.unique_devices = devices.len() as i64;
        Ok(stats)
    }

    async fn cleanup_tokens(&self, tenant_id: TenantId) -> Result<TokenCleanup, sqlx::Error> {
        let mut inner = self.inner.lock();
        let before = inner.tokens.len();

        inner.tokens.retain(|t| {
            t.tenant_id != tenant_id || t.device_id.as_deref().is_some_and(|d| !d.is_empty())
        });
        let removed_without_device = (before - inner.tokens.len()) as u64;

        // Newest (updated_at, created_at, id) per device survives.
        let mut keep: HashMap<String, (LocalTimestamp, LocalTimestamp, DbId)> = HashMap::new();
        for t in inner.tokens.iter().filter(|t| t.tenant_id == tenant_id) {
            let Some(device) = &t.device_id else { continue };
            let rank = (t.updated_at, t.created_at, t.id);
            keep.entry(device.clone())
                .and_modify(|best| {
                    if rank > *best {
                        *best = rank;
                    }
                })
                .or_insert(rank);
        }

        let before = inner.tokens.len();
        inner.tokens.retain(|t| {
            if t.tenant_id != tenant_id {
                return true;
            }
            match &t.device_id {
                Some(device) => keep.get(device).is_some_and(|best| best.2 == t.id),
                None => true,
            }
        });
        let removed_duplicates = (before - inner.tokens.len()) as u64;

        Ok(TokenCleanup {
            removed_without_device,
            removed_duplicates,
        })
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn insert_notification(
        &self,
        input: &NewNotification,
    ) -> Result<Notification, sqlx::Error> {
        let mut inner = self.inner.lock();
        let row = Notification {
            id: Inner::next_id(&mut inner.next_notification_id),
            tenant_id: input.tenant_id,
            title: input.title.clone(),
            body: input.body.clone(),
            notification_type: input.notification_type.clone(),
            target: input.target.as_str().to_owned(),
            scheduled_time: input.scheduled_time,
            status: input.status.as_str().to_owned(),
            created_at: input.created_at,
            sent_at: input.sent_at,
        };
        inner.notifications.push(StoredNotification {
            row: row.clone(),
            claim: None,
        });
        Ok(row)
    }

    async fn find_notification(
        &self,
        tenant_id: TenantId,
        id: DbId,
    ) -> Result<Option<Notification>, sqlx::Error> {
        Ok(self
            .inner
            .lock()
            .notifications
            .iter()
            .find(|n| n.row.tenant_id == tenant_id && n.row.id == id)
            .map(|n| n.row.clone()))
    }

    async fn list_notifications(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let mut rows: Vec<Notification> = self
            .inner
            .lock()
            .notifications
            .iter()
            .filter(|n| n.row.tenant_id == tenant_id)
            .map(|n| n.row.clone())
            .collect();
        rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(rows)
    }

    async fn list_due(
        &self,
        tenant_id: Option<TenantId>,
        as_of: LocalTimestamp,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let mut rows: Vec<Notification> = self
            .inner
            .lock()
            .notifications
            .iter()
            .map(|n| &n.row)
            .filter(|n| tenant_id.map_or(true, |t| n.tenant_id == t))
            .filter(|n| n.status == NotificationStatus::Scheduled.as_str())
            .filter(|n| is_due(n, as_of))
            .cloned()
            .collect();
        rows.sort_by_key(|n| (n.scheduled_time, n.id));
        Ok(rows)
    }

    async fn claim_for_dispatch(
        &self,
        id: DbId,
        claim: ClaimToken,
        now: LocalTimestamp,
        lease_until: LocalTimestamp,
    ) -> Result<bool, sqlx::Error> {
        let mut inner = self.inner.lock();
        let Some(stored) = inner.notification_mut(id) else {
            return Ok(false);
        };
        if !stored.is_scheduled() || stored.claim.is_some_and(|c| c.until >= now) {
            return Ok(false);
        }
        stored.claim = Some(Claim {
            owner: claim,
            until: lease_until,
        });
        Ok(true)
    }

    async fn extend_claim(
        &self,
        id: DbId,
        claim: ClaimToken,
        lease_until: LocalTimestamp,
    ) -> Result<bool, sqlx::Error> {
        let mut inner = self.inner.lock();
        match inner.notification_mut(id) {
            Some(stored) if stored.held_by(claim) => {
                stored.claim = Some(Claim {
                    owner: claim,
                    until: lease_until,
                });
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn release_claim(&self, id: DbId, claim: ClaimToken) -> Result<(), sqlx::Error> {
        let mut inner = self.inner.lock();
        if let Some(stored) = inner.notification_mut(id) {
            if stored.held_by(claim) {
                stored.claim = None;
            }
        }
        Ok(())
    }

    async fn mark_sent(
        &self,
        id: DbId,
        claim: ClaimToken,
        sent_at: LocalTimestamp,
    ) -> Result<bool, sqlx::Error> {
        let mut inner = self.inner.lock();
        let Some(stored) = inner.notification_mut(id) else {
            return Ok(false);
        };
        if !stored.held_by(claim) {
            return Ok(false);
        }
        stored.row.status = NotificationStatus::Sent.as_str().to_owned();
        stored.row.sent_at = Some(sent_at);
        stored.claim = None;
        Ok(true)
    }

    async fn notification_stats(
        &self,
        tenant_id: TenantId,
        as_of: LocalTimestamp,
    ) -> Result<NotificationStats, sqlx::Error> {
        let inner = self.inner.lock();
        let mut stats = NotificationStats::default();
        for n in inner
            .notifications
            .iter()
            .map(|n| &n.row)
            .filter(|n| n.tenant_id == tenant_id)
        {
            stats.total += 1;
            if n.is_sent() {
                stats.sent += 1;
            } else {
                stats.scheduled += 1;
                if is_due(n, as_of) {
                    stats.due += 1;
                }
            }
        }
        Ok(stats)
    }

    async fn delete_notification(
        &self,
        tenant_id: TenantId,
        id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let mut inner = self.inner.lock();
        let before = inner.notifications.len();
        inner
            .notifications
            .retain(|n| !(n.row.tenant_id == tenant_id && n.row.id == id));
        let removed = inner.notifications.len() < before;
        if removed {
            inner.deliveries.retain(|d| d.notification_id != id);
        }
        Ok(removed)
    }
}

#[async_trait]
impl DeliveryStore for MemoryStore {
    async fn pending_for(
        &self,
        tenant_id: TenantId,
        user_id: &str,
        since: LocalTimestamp,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let inner = self.inner.lock();
        let mut rows: Vec<Notification> = inner
            .notifications
            .iter()
            .map(|n| &n.row)
            .filter(|n| {
                n.tenant_id == tenant_id
                    && n.target == Audience::Authenticated.as_str()
                    && n.is_sent()
                    && n.created_at >= since
            })
            .filter(|n| {
                !inner
                    .deliveries
                    .iter()
                    .any(|d| d.notification_id == n.id && d.user_id == user_id)
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(rows)
    }

    async fn mark_delivered(
        &self,
        notification_id: DbId,
        user_id: &str,
        at: LocalTimestamp,
    ) -> Result<bool, sqlx::Error> {
        let mut inner = self.inner.lock();
        if !inner.notifications.iter().any(|n| n.row.id == notification_id) {
            // Mirrors the foreign key on notification_deliveries.
            return Err(sqlx::Error::RowNotFound);
        }
        if inner
            .deliveries
            .iter()
            .any(|d| d.notification_id == notification_id && d.user_id == user_id)
        {
            return Ok(false);
        }
        let record = DeliveryRecord {
            id: Inner::next_id(&mut inner.next_delivery_id),
            notification_id,
            user_id: user_id.to_owned(),
            delivered_at: at,
            read_at: None,
        };
        inner.deliveries.push(record);
        Ok(true)
    }

    async fn record_deliveries(
        &self,
        user_id: &str,
        notification_ids: &[DbId],
        at: LocalTimestamp,
    ) -> Result<u64, sqlx::Error> {
        let mut inner = self.inner.lock();
        let mut written = 0;
        for &notification_id in notification_ids {
            let exists = inner.notifications.iter().any(|n| n.row.id == notification_id);
            let recorded = inner
                .deliveries
                .iter()
                .any(|d| d.notification_id == notification_id && d.user_id == user_id);
            if !exists || recorded {
                continue;
            }
            let record = DeliveryRecord {
                id: Inner::next_id(&mut inner.next_delivery_id),
                notification_id,
                user_id: user_id.to_owned(),
                delivered_at: at,
                read_at: None,
            };
            inner.deliveries.push(record);
            written += 1;
        }
        Ok(written)
    }

    async fn mark_read(
        &self,
        notification_id: DbId,
        user_id: &str,
        at: LocalTimestamp,
    ) -> Result<bool, sqlx::Error> {
        let mut inner = self.inner.lock();
        match inner.deliveries.iter_mut().find(|d| {
            d.notification_id == notification_id && d.user_id == user_id && d.read_at.is_none()
        }) {
            Some(record) => {
                record.read_at = Some(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_deliveries(
        &self,
        notification_id: DbId,
    ) -> Result<Vec<DeliveryRecord>, sqlx::Error> {
        Ok(self
            .inner
            .lock()
            .deliveries
            .iter()
            .filter(|d| d.notification_id == notification_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), sqlx::Error> {
        Ok(())
    }
}
