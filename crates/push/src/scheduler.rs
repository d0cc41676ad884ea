//! Scheduled notification sweep.
//!
//! [`NotificationScheduler`] runs as a background task. Every tick it lists
//! the scheduled notifications that are due, across all tenants, and hands
//! each one to [`NotificationService::dispatch_scheduled`], which claims the
//! row before sending so concurrent sweeps (or an admin "send now") dispatch
//! it only once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::error::ServiceError;
use crate::service::NotificationService;

/// Counts from one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Scheduled notifications whose time had passed.
    pub due: usize,
    /// Notifications this sweep dispatched and marked sent.
    pub dispatched: usize,
    /// Due notifications another dispatcher had already claimed.
    pub skipped: usize,
    /// Due notifications left scheduled because of an error.
    pub failed: usize,
}

// ---------------------------------------------------------------------------
// NotificationScheduler
// ---------------------------------------------------------------------------

pub struct NotificationScheduler {
    service: Arc<NotificationService>,
    running: AtomicBool,
}

impl NotificationScheduler {
    pub fn new(service: Arc<NotificationService>) -> Self {
        Self {
            service,
            running: AtomicBool::new(false),
        }
    }

    /// Run the sweep loop until `cancel` fires.
    ///
    /// Ticks that arrive while a sweep is still running are dropped rather
    /// than queued.
    pub async fn run(&self, cancel: CancellationToken) {
        let period = self.service.config().interval;
        tracing::info!(interval_secs = period.as_secs(), "Notification scheduler started");

        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Notification scheduler cancelled");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.sweep_once().await {
                        tracing::error!(error = %e, "Notification sweep failed");
                    }
                }
            }
        }
    }

    /// Run one sweep now.
    ///
    /// Returns `Ok(None)` without doing anything if another sweep on this
    /// scheduler is still in progress. A failure on one notification is
    /// logged and counted; the rest of the batch still goes out.
    pub async fn sweep_once(&self) -> Result<Option<SweepReport>, ServiceError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Previous sweep still running, skipping tick");
            return Ok(None);
        }
        let _guard = SweepGuard(&self.running);
        self.sweep().await.map(Some)
    }

    async fn sweep(&self) -> Result<SweepReport, ServiceError> {
        let as_of = self.service.now();
        let due = self.service.store().list_due(None, as_of).await?;

        let mut report = SweepReport {
            due: due.len(),
            ..SweepReport::default()
        };

        for notification in &due {
            match self.service.dispatch_scheduled(notification, as_of).await {
                Ok(Some(_)) => report.dispatched += 1,
                Ok(None) => report.skipped += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(
                        notification_id = notification.id,
                        tenant_id = %notification.tenant_id,
                        error = %e,
                        "Failed to dispatch scheduled notification"
                    );
                }
            }
        }

        if report.due > 0 {
            tracing::info!(
                due = report.due,
                dispatched = report.dispatched,
                skipped = report.skipped,
                failed = report.failed,
                "Scheduled notification sweep complete"
            );
        } else {
            tracing::debug!("No scheduled notifications due");
        }

        Ok(report)
    }
}

/// Clears the in-progress flag when a sweep ends, including by panic.
struct SweepGuard<'a>(&'a AtomicBool);

impl Drop for SweepGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
