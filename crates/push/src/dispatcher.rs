//! Per-token fan-out of a notification.
//!
//! [`Dispatcher::dispatch`] sends one message per token through the
//! configured [`PushSender`], at most `concurrency` at a time, each bounded by
//! `send_timeout`. Per-token failures are collected into the
//! [`DispatchResult`] and logged; they never abort the dispatch and never
//! touch the token registry.

use std::sync::Arc;
use std::time::Duration;

use beacon_core::types::{DbId, LocalTimestamp};
use beacon_db::models::device_token::DeviceToken;
use beacon_db::models::notification::Notification;
use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::payload::PushPayload;
use crate::sender::{PushError, PushSender};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidToken,
    Transient,
    Other,
    Timeout,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::InvalidToken => "invalid_token",
            FailureKind::Transient => "transient",
            FailureKind::Other => "other",
            FailureKind::Timeout => "timeout",
        }
    }
}

impl From<&PushError> for FailureKind {
    fn from(err: &PushError) -> Self {
        match err {
            PushError::InvalidToken(_) => FailureKind::InvalidToken,
            PushError::Transient(_) => FailureKind::Transient,
            PushError::Other(_) => FailureKind::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenFailure {
    pub token_id: DbId,
    pub kind: FailureKind,
    pub message: String,
}

/// Outcome of one dispatch. Token ids, in completion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchResult {
    pub succeeded: Vec<DbId>,
    pub failed: Vec<TokenFailure>,
}

impl DispatchResult {
    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct Dispatcher {
    sender: Arc<dyn PushSender>,
    concurrency: usize,
    send_timeout: Duration,
}

impl Dispatcher {
    pub fn new(sender: Arc<dyn PushSender>, concurrency: usize, send_timeout: Duration) -> Self {
        Self {
            sender,
            concurrency: concurrency.max(1),
            send_timeout,
        }
    }

    /// Upper bound on how long dispatching to `token_count` tokens can take.
    pub fn worst_case(&self, token_count: usize) -> Duration {
        let rounds = token_count.div_ceil(self.concurrency);
        self.send_timeout
            .saturating_mul(u32::try_from(rounds).unwrap_or(u32::MAX))
    }

    /// Send `notification` to every token in `tokens`.
    pub async fn dispatch(
        &self,
        notification: &Notification,
        tokens: &[DeviceToken],
        dispatched_at: LocalTimestamp,
    ) -> DispatchResult {
        let payload = Arc::new(PushPayload::for_notification(notification, dispatched_at));
        let send_timeout = self.send_timeout;

        let outcomes: Vec<(DbId, Result<(), TokenFailure>)> = stream::iter(tokens.to_vec())
            .map(move |token| {
                let sender = Arc::clone(&self.sender);
                let payload = Arc::clone(&payload);
                async move {
                    let token_id = token.id;
                    (token_id, send_one(sender, token, payload, send_timeout).await)
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut result = DispatchResult::default();
        for (token_id, outcome) in outcomes {
            match outcome {
                Ok(()) => result.succeeded.push(token_id),
                Err(failure) => {
                    tracing::warn!(
                        notification_id = notification.id,
                        token_id,
                        kind = failure.kind.as_str(),
                        error = %failure.message,
                        "Push send failed"
                    );
                    result.failed.push(failure);
                }
            }
        }

        tracing::info!(
            notification_id = notification.id,
            succeeded = result.succeeded.len(),
            failed = result.failed.len(),
            "Dispatch complete"
        );
        result
    }
}

async fn send_one(
    sender: Arc<dyn PushSender>,
    token: DeviceToken,
    payload: Arc<PushPayload>,
    send_timeout: Duration,
) -> Result<(), TokenFailure> {
    match tokio::time::timeout(send_timeout, sender.send(&token.token, &payload)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(TokenFailure {
            token_id: token.id,
            kind: FailureKind::from(&err),
            message: err.to_string(),
        }),
        Err(_) => Err(TokenFailure {
            token_id: token.id,
            kind: FailureKind::Timeout,
            message: format!("Send timed out after {}s", send_timeout.as_secs()),
        }),
    }
}
