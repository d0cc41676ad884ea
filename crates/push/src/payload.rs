//! Data-only push payload.
//!
//! Messages carry no transport-native `notification` block. The mobile client
//! renders the alert itself from the data keys, so a device never shows a
//! second, transport-rendered copy of the same notification.

use beacon_core::types::LocalTimestamp;
use beacon_db::models::notification::Notification;
use serde::Serialize;

/// Android delivery priority for every message.
pub const ANDROID_PRIORITY: &str = "high";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Key/value data delivered to the client. FCM requires string values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushData {
    pub notification_id: String,
    pub title: String,
    pub body: String,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub target: String,
    pub timestamp: String,
    pub data_only: String,
}

/// One push message, independent of the recipient token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushPayload {
    pub data: PushData,
}

impl PushPayload {
    /// Build the payload for `notification`, stamped with the dispatch time.
    pub fn for_notification(notification: &Notification, dispatched_at: LocalTimestamp) -> Self {
        Self {
            data: PushData {
                notification_id: notification.id.to_string(),
                title: notification.title.clone(),
                body: notification.body.clone(),
                notification_type: notification.notification_type.clone(),
                target: notification.target.clone(),
                timestamp: dispatched_at.format(TIMESTAMP_FORMAT).to_string(),
                data_only: "true".to_string(),
            },
        }
    }

    /// The FCM v1 `messages:send` request body addressed to `token`.
    pub fn to_fcm_message(&self, token: &str) -> serde_json::Value {
        serde_json::json!({
            "message": {
                "token": token,
                "data": self.data,
                "android": { "priority": ANDROID_PRIORITY },
            }
        })
    }
}
