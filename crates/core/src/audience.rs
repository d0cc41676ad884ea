//! Audience directives and the token membership predicates behind them.
//!
//! The predicates here are the single definition of who counts as an
//! authenticated user and who counts as a guest. The SQL in the repository
//! layer and the in-process store both mirror them.
//!
//! Note the asymmetry: `authenticated` requires the flag AND a user id, while
//! `guests` accepts the cleared flag OR a missing user id. A row carrying a
//! stray user id with the flag cleared is therefore a guest, and so is a row
//! with the flag set but no user id.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub const AUDIENCE_ALL: &str = "all";
pub const AUDIENCE_AUTHENTICATED: &str = "authenticated";
pub const AUDIENCE_GUESTS: &str = "guests";

/// Which device tokens a notification is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    All,
    Authenticated,
    Guests,
}

impl Audience {
    pub fn as_str(self) -> &'static str {
        match self {
            Audience::All => AUDIENCE_ALL,
            Audience::Authenticated => AUDIENCE_AUTHENTICATED,
            Audience::Guests => AUDIENCE_GUESTS,
        }
    }

    /// Whether a token with the given auth state belongs to this audience.
    pub fn includes(self, is_authenticated: bool, user_id: Option<&str>) -> bool {
        match self {
            Audience::All => true,
            Audience::Authenticated => is_authenticated_member(is_authenticated, user_id),
            Audience::Guests => is_guest_member(is_authenticated, user_id),
        }
    }
}

impl fmt::Display for Audience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Audience {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            AUDIENCE_ALL => Ok(Audience::All),
            AUDIENCE_AUTHENTICATED => Ok(Audience::Authenticated),
            AUDIENCE_GUESTS => Ok(Audience::Guests),
            other => Err(CoreError::Validation(format!(
                "Unknown target '{other}', expected one of: all, authenticated, guests"
            ))),
        }
    }
}

fn has_user(user_id: Option<&str>) -> bool {
    user_id.is_some_and(|u| !u.is_empty())
}

/// `is_authenticated = true AND user_id is non-empty`.
pub fn is_authenticated_member(is_authenticated: bool, user_id: Option<&str>) -> bool {
    is_authenticated && has_user(user_id)
}

/// `is_authenticated = false OR user_id is empty`.
pub fn is_guest_member(is_authenticated: bool, user_id: Option<&str>) -> bool {
    !is_authenticated || !has_user(user_id)
}

/// The auth flag disagrees with the presence of a user id.
pub fn is_inconsistent(is_authenticated: bool, user_id: Option<&str>) -> bool {
    is_authenticated != has_user(user_id)
}
