use std::sync::Arc;

use beacon_push::NotificationService;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheap to clone; everything inside is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The notification engine, including its store.
    pub service: Arc<NotificationService>,
}
