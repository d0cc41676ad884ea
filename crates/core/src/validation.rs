//! Small input checks shared by the service layer.

use crate::error::CoreError;

/// Reject missing or whitespace-only required fields.
pub fn require_non_blank(field: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

/// Normalize an optional user id: blank means "no user".
pub fn normalize_user_id(user_id: Option<&str>) -> Option<&str> {
    user_id.map(str::trim).filter(|u| !u.is_empty())
}
