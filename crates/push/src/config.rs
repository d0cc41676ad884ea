use std::time::Duration;

use beacon_core::schedule::GRACE_THRESHOLD_SECS;

/// Notification engine configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Time between scheduler sweeps (default: 60 s).
    pub interval: Duration,
    /// Schedules at most this far ahead of "now" are sent immediately.
    pub grace_secs: i64,
    /// Maximum concurrent sends within one dispatch.
    pub dispatch_concurrency: usize,
    /// Upper bound on a single send; a slower send counts as a failed token.
    pub send_timeout: Duration,
    /// How far back the pull path looks for undelivered notifications.
    pub pending_lookback_days: i64,
    /// How long a sweep's claim on a due notification lasts before another
    /// sweep may take it over.
    pub claim_lease_secs: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            grace_secs: GRACE_THRESHOLD_SECS,
            dispatch_concurrency: 16,
            send_timeout: Duration::from_secs(10),
            pending_lookback_days: 7,
            claim_lease_secs: 300,
        }
    }
}

impl SchedulerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default |
    /// |-----------------------------|---------|
    /// | `SCHEDULER_INTERVAL_SECS`   | `60`    |
    /// | `SCHEDULE_GRACE_SECS`       | `10`    |
    /// | `DISPATCH_CONCURRENCY`      | `16`    |
    /// | `PUSH_SEND_TIMEOUT_SECS`    | `10`    |
    /// | `PENDING_LOOKBACK_DAYS`     | `7`     |
    /// | `DISPATCH_CLAIM_LEASE_SECS` | `300`   |
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from `lookup`, which maps a variable name to
    /// its value. Durations and the concurrency are clamped to at least one.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let interval_secs: u64 = lookup("SCHEDULER_INTERVAL_SECS")
            .unwrap_or_else(|| "60".into())
            .parse()
            .expect("SCHEDULER_INTERVAL_SECS must be a valid u64");

        let grace_secs: i64 = lookup("SCHEDULE_GRACE_SECS")
            .unwrap_or_else(|| GRACE_THRESHOLD_SECS.to_string())
            .parse()
            .expect("SCHEDULE_GRACE_SECS must be a valid i64");

        let dispatch_concurrency: usize = lookup("DISPATCH_CONCURRENCY")
            .unwrap_or_else(|| "16".into())
            .parse()
            .expect("DISPATCH_CONCURRENCY must be a valid usize");

        let send_timeout_secs: u64 = lookup("PUSH_SEND_TIMEOUT_SECS")
            .unwrap_or_else(|| "10".into())
            .parse()
            .expect("PUSH_SEND_TIMEOUT_SECS must be a valid u64");

        let pending_lookback_days: i64 = lookup("PENDING_LOOKBACK_DAYS")
            .unwrap_or_else(|| "7".into())
            .parse()
            .expect("PENDING_LOOKBACK_DAYS must be a valid i64");

        let claim_lease_secs: i64 = lookup("DISPATCH_CLAIM_LEASE_SECS")
            .unwrap_or_else(|| "300".into())
            .parse()
            .expect("DISPATCH_CLAIM_LEASE_SECS must be a valid i64");

        Self {
            interval: Duration::from_secs(interval_secs.max(1)),
            grace_secs,
            dispatch_concurrency: dispatch_concurrency.max(1),
            send_timeout: Duration::from_secs(send_timeout_secs.max(1)),
            pending_lookback_days,
            claim_lease_secs: claim_lease_secs.max(1),
        }
    }

    pub fn pending_lookback(&self) -> chrono::Duration {
        chrono::Duration::days(self.pending_lookback_days)
    }

    pub fn claim_lease(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.claim_lease_secs)
    }
}
