use beacon_core::error::CoreError;

/// Error returned by [`NotificationService`](crate::NotificationService)
/// operations.
///
/// Transport failures never appear here; they are per token and end up in
/// [`DispatchResult::failed`](crate::DispatchResult).
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),
}
