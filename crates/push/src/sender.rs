//! The push transport capability.

use async_trait::async_trait;

use crate::payload::PushPayload;

/// Outcome classes a transport reports for a single token.
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    /// The transport no longer recognises the token (uninstalled app,
    /// rotated registration).
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Rate limiting or a server-side failure; a later attempt may succeed.
    #[error("Transient push failure: {0}")]
    Transient(String),

    #[error("Push failed: {0}")]
    Other(String),
}

/// Sends one message to one device token.
///
/// Implementations make a single attempt; the engine never retries a token
/// within a dispatch.
#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send(&self, token: &str, payload: &PushPayload) -> Result<(), PushError>;
}
