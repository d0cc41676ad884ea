//! Well-known notification type tags.
//!
//! These must match the values stored in the `notifications.type` column and
//! the `type` key of the push data payload the mobile client switches on.

use crate::error::CoreError;

/// Informational message. Default when the author does not pick a type.
pub const TYPE_INFO: &str = "info";

/// Confirmation of a completed operation.
pub const TYPE_SUCCESS: &str = "success";

/// Something the user should pay attention to.
pub const TYPE_WARNING: &str = "warning";

/// A failure the user needs to act on.
pub const TYPE_ERROR: &str = "error";

pub const ALL_TYPES: [&str; 4] = [TYPE_INFO, TYPE_SUCCESS, TYPE_WARNING, TYPE_ERROR];

/// Resolve an optional type tag, defaulting to [`TYPE_INFO`].
pub fn resolve_type(raw: Option<&str>) -> Result<&'static str, CoreError> {
    let raw = match raw.map(str::trim) {
        None | Some("") => return Ok(TYPE_INFO),
        Some(r) => r,
    };
    ALL_TYPES
        .iter()
        .find(|t| **t == raw)
        .copied()
        .ok_or_else(|| {
            CoreError::Validation(format!(
                "Unknown notification type '{raw}', expected one of: {}",
                ALL_TYPES.join(", ")
            ))
        })
}
