//! Device token models and DTOs.

use beacon_core::audience;
use beacon_core::types::{DbId, LocalTimestamp, TenantId};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `device_tokens` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct DeviceToken {
    pub id: DbId,
    pub tenant_id: TenantId,
    pub token: String,
    pub device_id: Option<String>,
    pub platform: String,
    pub user_id: Option<String>,
    pub user_email: Option<String>,
    pub is_authenticated: bool,
    pub created_at: LocalTimestamp,
    pub updated_at: LocalTimestamp,
}

impl DeviceToken {
    pub fn is_authenticated_user(&self) -> bool {
        audience::is_authenticated_member(self.is_authenticated, self.user_id.as_deref())
    }

    pub fn is_guest(&self) -> bool {
        audience::is_guest_member(self.is_authenticated, self.user_id.as_deref())
    }

    /// The auth flag disagrees with the stored user id.
    pub fn is_inconsistent(&self) -> bool {
        audience::is_inconsistent(self.is_authenticated, self.user_id.as_deref())
    }
}

/// DTO for registering a device token, or reporting a login/logout on it.
///
/// A missing or blank `user_id` is a guest registration (or a logout).
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterToken {
    #[validate(length(min = 1, max = 4096))]
    pub token: String,
    #[validate(length(min = 1, max = 255))]
    pub device_id: String,
    #[validate(length(min = 1, max = 32))]
    pub platform: String,
    #[validate(length(max = 255))]
    pub user_id: Option<String>,
    #[validate(length(max = 320))]
    pub user_email: Option<String>,
}

/// Per-tenant token counts, using the audience predicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow, Serialize)]
pub struct TokenStats {
    pub total: i64,
    pub authenticated: i64,
    pub guests: i64,
    pub unique_devices: i64,
    pub inconsistent: i64,
}

/// Outcome of a token maintenance sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TokenCleanup {
    /// Rows with no `device_id`.
    pub removed_without_device: u64,
    /// Older rows sharing a `device_id` with a more recently updated one.
    pub removed_duplicates: u64,
}

/// Normalized registration written by the token store.
///
/// Built by the service from a validated [`RegisterToken`]; `user_id` is
/// already `None` when the client sent a blank one.
#[derive(Debug, Clone, Copy)]
pub struct TokenUpsert<'a> {
    pub token: &'a str,
    pub device_id: &'a str,
    pub platform: &'a str,
    pub user_id: Option<&'a str>,
    pub user_email: Option<&'a str>,
}

impl TokenUpsert<'_> {
    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    /// The email is only kept alongside a user id; logout clears both.
    pub fn user_email(&self) -> Option<&str> {
        self.user_id.and(self.user_email)
    }
}
