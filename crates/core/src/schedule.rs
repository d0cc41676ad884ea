//! Schedule input parsing and the grace-threshold rule.
//!
//! Admins enter schedule times in a browser `datetime-local` field, which has
//! no zone. Such input is taken verbatim as local wall-clock time and stored
//! as a [`LocalTimestamp`]; the scheduler compares it against
//! [`Clock::now`](crate::clock::Clock::now), which is also local wall-clock
//! time. Input that does carry a zone (`Z` or an offset) is converted to the
//! server's local wall-clock time once, here, and never again.

use chrono::{DateTime, Local, NaiveDateTime};

use crate::error::CoreError;
use crate::lifecycle::NotificationStatus;
use crate::types::LocalTimestamp;

/// Schedules closer than this to "now" are sent immediately.
pub const GRACE_THRESHOLD_SECS: i64 = 10;

/// Zone-less formats accepted as local wall-clock time, most specific first.
const LOCAL_FORMATS: [&str; 6] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Parse an admin-entered schedule time.
///
/// Returns `Ok(None)` for blank input, which means "send now".
pub fn parse_schedule_input(raw: &str) -> Result<Option<LocalTimestamp>, CoreError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    if let Ok(zoned) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(zoned.with_timezone(&Local).naive_local()));
    }

    LOCAL_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(Some)
        .ok_or_else(|| {
            CoreError::Validation(format!(
                "Invalid scheduled_time '{raw}', expected YYYY-MM-DDTHH:MM[:SS] or RFC 3339"
            ))
        })
}

/// Decide the initial status of a new notification.
///
/// No schedule, a past schedule, or one at most `grace_secs` ahead of `now`
/// means the notification is dispatched right away and stored as `sent`.
pub fn initial_status(
    now: LocalTimestamp,
    scheduled_time: Option<LocalTimestamp>,
    grace_secs: i64,
) -> NotificationStatus {
    match scheduled_time {
        Some(at) if at - now > chrono::Duration::seconds(grace_secs) => {
            NotificationStatus::Scheduled
        }
        _ => NotificationStatus::Sent,
    }
}
