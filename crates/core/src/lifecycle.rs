//! Notification status state machine.
//!
//! A notification is either waiting for its scheduled time or already sent.
//! `scheduled -> sent` is the only transition and it happens at most once.
//! There is deliberately no `failed` status: transport failures are per token
//! and never change the notification's status.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub const STATUS_SCHEDULED: &str = "scheduled";
pub const STATUS_SENT: &str = "sent";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Scheduled,
    Sent,
}

impl NotificationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationStatus::Scheduled => STATUS_SCHEDULED,
            NotificationStatus::Sent => STATUS_SENT,
        }
    }
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            STATUS_SCHEDULED => Ok(NotificationStatus::Scheduled),
            STATUS_SENT => Ok(NotificationStatus::Sent),
            other => Err(CoreError::Internal(format!(
                "Unknown notification status '{other}'"
            ))),
        }
    }
}

pub mod state_machine {
    use super::NotificationStatus;

    /// Returns the set of statuses reachable from `from`.
    pub fn valid_transitions(from: NotificationStatus) -> &'static [NotificationStatus] {
        match from {
            NotificationStatus::Scheduled => &[NotificationStatus::Sent],
            NotificationStatus::Sent => &[],
        }
    }

    pub fn can_transition(from: NotificationStatus, to: NotificationStatus) -> bool {
        valid_transitions(from).contains(&to)
    }
}
