//! Notification entity models and DTOs.

use beacon_core::audience::Audience;
use beacon_core::error::CoreError;
use beacon_core::lifecycle::NotificationStatus;
use beacon_core::types::{DbId, LocalTimestamp, TenantId};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `notifications` table.
///
/// The dispatch claim column (`claimed_until`) is bookkeeping for the
/// scheduler and is not part of the entity.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Notification {
    pub id: DbId,
    pub tenant_id: TenantId,
    pub title: String,
    pub body: String,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub target: String,
    pub scheduled_time: Option<LocalTimestamp>,
    pub status: String,
    pub created_at: LocalTimestamp,
    pub sent_at: Option<LocalTimestamp>,
}

impl Notification {
    pub fn audience(&self) -> Result<Audience, CoreError> {
        self.target.parse()
    }

    pub fn lifecycle_status(&self) -> Result<NotificationStatus, CoreError> {
        self.status.parse()
    }

    pub fn is_sent(&self) -> bool {
        matches!(self.lifecycle_status(), Ok(NotificationStatus::Sent))
    }
}

/// Insert DTO built by the service once input has been validated and the
/// initial status decided.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub tenant_id: TenantId,
    pub title: String,
    pub body: String,
    pub notification_type: String,
    pub target: Audience,
    pub scheduled_time: Option<LocalTimestamp>,
    pub status: NotificationStatus,
    pub created_at: LocalTimestamp,
    pub sent_at: Option<LocalTimestamp>,
}

/// DTO for authoring a notification.
///
/// `scheduled_time` is the raw admin input; it is parsed by
/// [`parse_schedule_input`](beacon_core::schedule::parse_schedule_input).
/// `message` is accepted as an alias of `body` for older admin clients.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateNotification {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[serde(alias = "message")]
    #[validate(length(min = 1, max = 4000))]
    pub body: String,
    #[serde(rename = "type")]
    pub notification_type: Option<String>,
    pub target: Option<String>,
    pub scheduled_time: Option<String>,
}

/// Per-tenant notification counts for the admin dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow, Serialize)]
pub struct NotificationStats {
    pub total: i64,
    pub sent: i64,
    pub scheduled: i64,
    /// Scheduled rows whose time has passed but no sweep has picked up yet.
    pub due: i64,
}
