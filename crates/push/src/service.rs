//! Notification engine operations.
//!
//! [`NotificationService`] is what the HTTP layer and the scheduler call. It
//! owns validation, the grace-threshold decision, the claim → resolve →
//! dispatch → mark-sent pipeline, and the pull path's delivery bookkeeping.
//!
//! Every dispatch, immediate or scheduled, runs under a dispatch claim: a
//! random [`ClaimToken`] plus a lease end stored on the row. The lease is
//! sized to cover the whole fan-out before the first send, and only the
//! holder may mark the row sent.

use std::sync::Arc;

use beacon_core::audience::Audience;
use beacon_core::clock::Clock;
use beacon_core::error::CoreError;
use beacon_core::lifecycle::{state_machine, NotificationStatus};
use beacon_core::notification_types::resolve_type;
use beacon_core::schedule::{initial_status, parse_schedule_input};
use beacon_core::types::{ClaimToken, DbId, LocalTimestamp, TenantId};
use beacon_core::validation::{normalize_user_id, require_non_blank};
use beacon_db::models::device_token::{
    DeviceToken, RegisterToken, TokenCleanup, TokenStats, TokenUpsert,
};
use beacon_db::models::notification::{
    CreateNotification, NewNotification, Notification, NotificationStats,
};
use beacon_db::Store;
use serde::Serialize;
use validator::Validate;

use crate::config::SchedulerConfig;
use crate::dispatcher::{DispatchResult, Dispatcher};
use crate::error::ServiceError;
use crate::resolver::AudienceResolver;
use crate::sender::PushSender;

/// Cap on the fan-out part of a dispatch lease.
const MAX_FAN_OUT_DAYS: i64 = 1;

/// Result of [`NotificationService::create_notification`].
#[derive(Debug, Clone, Serialize)]
pub struct CreatedNotification {
    pub id: DbId,
    pub status: NotificationStatus,
    pub scheduled_time: Option<LocalTimestamp>,
    /// Present when the notification was dispatched immediately.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispatch: Option<DispatchResult>,
}

#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    dispatcher: Dispatcher,
    config: SchedulerConfig,
}

impl NotificationService {
    pub fn new(
        store: Arc<dyn Store>,
        sender: Arc<dyn PushSender>,
        clock: Arc<dyn Clock>,
        config: SchedulerConfig,
    ) -> Self {
        let dispatcher = Dispatcher::new(sender, config.dispatch_concurrency, config.send_timeout);
        Self {
            store,
            clock,
            dispatcher,
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn now(&self) -> LocalTimestamp {
        self.clock.now()
    }

    // -----------------------------------------------------------------------
    // Authoring
    // -----------------------------------------------------------------------

    /// Validate and store a notification, dispatching it right away unless
    /// it is scheduled more than the grace threshold into the future.
    ///
    /// An immediate send is stored as scheduled and then dispatched on its
    /// own task through [`dispatch_scheduled`](Self::dispatch_scheduled).
    /// Dropping the returned future does not stop that task, and if it fails
    /// before marking the row sent the next sweep picks the row up.
    pub async fn create_notification(
        &self,
        tenant_id: TenantId,
        input: &CreateNotification,
    ) -> Result<CreatedNotification, ServiceError> {
        input.validate().map_err(validation_error)?;
        require_non_blank("title", &input.title)?;
        require_non_blank("body", &input.body)?;
        let notification_type = resolve_type(input.notification_type.as_deref())?;
        let target = match input.target.as_deref().map(str::trim) {
            None | Some("") => Audience::All,
            Some(raw) => raw.parse::<Audience>()?,
        };
        let scheduled_time = match input.scheduled_time.as_deref() {
            Some(raw) => parse_schedule_input(raw)?,
            None => None,
        };

        let now = self.clock.now();
        let requested = initial_status(now, scheduled_time, self.config.grace_secs);

        let notification = self
            .store
            .insert_notification(&NewNotification {
                tenant_id,
                title: input.title.trim().to_string(),
                body: input.body.trim().to_string(),
                notification_type: notification_type.to_string(),
                target,
                scheduled_time,
                status: NotificationStatus::Scheduled,
                created_at: now,
                sent_at: None,
            })
            .await?;

        tracing::info!(
            %tenant_id,
            notification_id = notification.id,
            %target,
            status = %requested,
            scheduled_time = ?scheduled_time,
            "Notification created"
        );

        let id = notification.id;
        let (status, dispatch) = match requested {
            NotificationStatus::Scheduled => (NotificationStatus::Scheduled, None),
            NotificationStatus::Sent => self.dispatch_detached(notification, now).await?,
        };

        Ok(CreatedNotification {
            id,
            status,
            scheduled_time,
            dispatch,
        })
    }

    async fn dispatch_detached(
        &self,
        notification: Notification,
        now: LocalTimestamp,
    ) -> Result<(NotificationStatus, Option<DispatchResult>), ServiceError> {
        let id = notification.id;
        let service = self.clone();
        let task =
            tokio::spawn(async move { service.dispatch_scheduled(&notification, now).await });

        match task.await {
            Ok(Ok(Some(result))) => Ok((NotificationStatus::Sent, Some(result))),
            // A sweep claimed the row first and is sending it.
            Ok(Ok(None)) => Ok((NotificationStatus::Sent, None)),
            Ok(Err(e)) => {
                tracing::warn!(
                    notification_id = id,
                    error = %e,
                    "Immediate dispatch failed; left for the scheduler"
                );
                Ok((NotificationStatus::Scheduled, None))
            }
            Err(join_err) => Err(CoreError::Internal(format!(
                "Dispatch task for notification {id} failed: {join_err}"
            ))
            .into()),
        }
    }

    /// A tenant's notifications, newest first.
    pub async fn list_notifications(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<Notification>, ServiceError> {
        Ok(self.store.list_notifications(tenant_id).await?)
    }

    pub async fn notification_stats(
        &self,
        tenant_id: TenantId,
    ) -> Result<NotificationStats, ServiceError> {
        Ok(self
            .store
            .notification_stats(tenant_id, self.clock.now())
            .await?)
    }

    pub async fn delete_notification(
        &self,
        tenant_id: TenantId,
        id: DbId,
    ) -> Result<(), ServiceError> {
        if !self.store.delete_notification(tenant_id, id).await? {
            return Err(not_found(id).into());
        }
        tracing::info!(%tenant_id, notification_id = id, "Notification deleted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------------

    /// Dispatch a scheduled notification ahead of its time.
    ///
    /// Goes through the same claim as the scheduler sweep, so the two can
    /// never both send it.
    pub async fn send_now(
        &self,
        tenant_id: TenantId,
        id: DbId,
    ) -> Result<DispatchResult, ServiceError> {
        let notification = self
            .store
            .find_notification(tenant_id, id)
            .await?
            .ok_or_else(|| not_found(id))?;

        let status = notification.lifecycle_status()?;
        if !state_machine::can_transition(status, NotificationStatus::Sent) {
            return Err(CoreError::Conflict(format!("Notification {id} has already been sent")).into());
        }

        self.dispatch_scheduled(&notification, self.clock.now())
            .await?
            .ok_or_else(|| {
                CoreError::Conflict(format!("Notification {id} is already being dispatched"))
                    .into()
            })
    }

    /// Claim, resolve, dispatch and mark one scheduled notification as sent.
    ///
    /// Returns `Ok(None)` when another dispatcher holds the claim or the row
    /// is no longer scheduled. If resolution fails the claim is released and
    /// the row stays scheduled for the next sweep.
    pub async fn dispatch_scheduled(
        &self,
        notification: &Notification,
        now: LocalTimestamp,
    ) -> Result<Option<DispatchResult>, ServiceError> {
        let claim = ClaimToken::new_v4();
        let lease_until = now + self.config.claim_lease();
        if !self
            .store
            .claim_for_dispatch(notification.id, claim, now, lease_until)
            .await?
        {
            tracing::debug!(notification_id = notification.id, "Notification already claimed");
            return Ok(None);
        }

        let tokens = match AudienceResolver::resolve(&*self.store, notification).await {
            Ok(tokens) => tokens,
            Err(e) => {
                self.release(notification.id, claim).await;
                return Err(e);
            }
        };

        // The lease must outlast every send before the first one starts.
        let lease_until = self.clock.now() + self.dispatch_lease(tokens.len());
        if !self
            .store
            .extend_claim(notification.id, claim, lease_until)
            .await?
        {
            tracing::warn!(
                notification_id = notification.id,
                "Dispatch claim lost before sending"
            );
            return Ok(None);
        }

        let result = self.dispatcher.dispatch(notification, &tokens, now).await;

        // The claim stays in place if this fails; the row is retried once the
        // lease expires.
        if !self
            .store
            .mark_sent(notification.id, claim, self.clock.now())
            .await?
        {
            tracing::warn!(
                notification_id = notification.id,
                "Dispatch claim no longer held when marking sent"
            );
        }
        Ok(Some(result))
    }

    /// Base lease plus the longest the fan-out to `token_count` tokens can
    /// take.
    fn dispatch_lease(&self, token_count: usize) -> chrono::Duration {
        let fan_out = chrono::Duration::from_std(self.dispatcher.worst_case(token_count))
            .unwrap_or_else(|_| chrono::Duration::days(MAX_FAN_OUT_DAYS));
        self.config.claim_lease() + fan_out.min(chrono::Duration::days(MAX_FAN_OUT_DAYS))
    }

    async fn release(&self, id: DbId, claim: ClaimToken) {
        if let Err(e) = self.store.release_claim(id, claim).await {
            tracing::error!(notification_id = id, error = %e, "Failed to release dispatch claim");
        }
    }

    // -----------------------------------------------------------------------
    // Token registry
    // -----------------------------------------------------------------------

    /// Register a device token, or record a login/logout on an existing one.
    pub async fn register_token(
        &self,
        tenant_id: TenantId,
        input: &RegisterToken,
    ) -> Result<DeviceToken, ServiceError> {
        input.validate().map_err(validation_error)?;
        require_non_blank("token", &input.token)?;
        require_non_blank("device_id", &input.device_id)?;
        require_non_blank("platform", &input.platform)?;

        let upsert = TokenUpsert {
            token: input.token.trim(),
            device_id: input.device_id.trim(),
            platform: input.platform.trim(),
            user_id: normalize_user_id(input.user_id.as_deref()),
            user_email: input
                .user_email
                .as_deref()
                .map(str::trim)
                .filter(|e| !e.is_empty()),
        };
        let token = self
            .store
            .upsert_token(tenant_id, &upsert, self.clock.now())
            .await?;

        tracing::info!(
            %tenant_id,
            token_id = token.id,
            platform = %token.platform,
            is_authenticated = token.is_authenticated,
            "Device token registered"
        );
        Ok(token)
    }

    /// Tokens whose auth flag disagrees with their user id. Read-only.
    pub async fn detect_token_inconsistencies(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<DeviceToken>, ServiceError> {
        let rows = self.store.find_inconsistent_tokens(tenant_id).await?;
        if !rows.is_empty() {
            tracing::warn!(%tenant_id, count = rows.len(), "Inconsistent device tokens found");
        }
        Ok(rows)
    }

    pub async fn token_stats(&self, tenant_id: TenantId) -> Result<TokenStats, ServiceError> {
        Ok(self.store.token_stats(tenant_id).await?)
    }

    /// Remove tokens without a device id and older duplicates per device.
    pub async fn cleanup_tokens(&self, tenant_id: TenantId) -> Result<TokenCleanup, ServiceError> {
        let result = self.store.cleanup_tokens(tenant_id).await?;
        tracing::info!(
            %tenant_id,
            removed_without_device = result.removed_without_device,
            removed_duplicates = result.removed_duplicates,
            "Device token cleanup complete"
        );
        Ok(result)
    }

    // -----------------------------------------------------------------------
    // Pull path
    // -----------------------------------------------------------------------

    /// Recent `authenticated` notifications the user has not seen yet.
    ///
    /// Every notification returned is recorded as delivered in one atomic
    /// write, so it surfaces at most once per user. If that write fails
    /// nothing is recorded and the whole batch stays pending.
    pub async fn pending_notifications_for(
        &self,
        tenant_id: TenantId,
        user_id: &str,
    ) -> Result<Vec<Notification>, ServiceError> {
        require_non_blank("user_id", user_id)?;
        let user_id = user_id.trim();
        let now = self.clock.now();
        let since = now - self.config.pending_lookback();

        let pending = self.store.pending_for(tenant_id, user_id, since).await?;
        if !pending.is_empty() {
            let ids: Vec<DbId> = pending.iter().map(|n| n.id).collect();
            self.store.record_deliveries(user_id, &ids, now).await?;
        }

        tracing::debug!(%tenant_id, user_id, count = pending.len(), "Pending notifications served");
        Ok(pending)
    }

    /// Record a delivery explicitly. Returns `false` if one already existed.
    pub async fn mark_delivered(
        &self,
        tenant_id: TenantId,
        notification_id: DbId,
        user_id: &str,
    ) -> Result<bool, ServiceError> {
        require_non_blank("user_id", user_id)?;
        self.ensure_exists(tenant_id, notification_id).await?;
        Ok(self
            .store
            .mark_delivered(notification_id, user_id.trim(), self.clock.now())
            .await?)
    }

    /// Set the read timestamp on a delivery. Returns `false` if there is no
    /// unread delivery record for the pair.
    pub async fn mark_read(
        &self,
        tenant_id: TenantId,
        notification_id: DbId,
        user_id: &str,
    ) -> Result<bool, ServiceError> {
        require_non_blank("user_id", user_id)?;
        self.ensure_exists(tenant_id, notification_id).await?;
        Ok(self
            .store
            .mark_read(notification_id, user_id.trim(), self.clock.now())
            .await?)
    }

    async fn ensure_exists(&self, tenant_id: TenantId, id: DbId) -> Result<(), ServiceError> {
        match self.store.find_notification(tenant_id, id).await? {
            Some(_) => Ok(()),
            None => Err(not_found(id).into()),
        }
    }
}

fn not_found(id: DbId) -> CoreError {
    CoreError::NotFound {
        entity: "Notification",
        id,
    }
}

fn validation_error(errors: validator::ValidationErrors) -> CoreError {
    CoreError::Validation(errors.to_string())
}
