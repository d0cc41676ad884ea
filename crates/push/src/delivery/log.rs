use async_trait::async_trait;

use crate::payload::PushPayload;
use crate::sender::{PushError, PushSender};

/// A [`PushSender`] that records each send in the log and always succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSender;

#[async_trait]
impl PushSender for LogSender {
    async fn send(&self, token: &str, payload: &PushPayload) -> Result<(), PushError> {
        tracing::info!(
            notification_id = %payload.data.notification_id,
            token_prefix = %token.chars().take(12).collect::<String>(),
            title = %payload.data.title,
            "Push transport not configured, message logged only"
        );
        Ok(())
    }
}
