//! Route definitions for the `/notifications` resource.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::notification;
use crate::state::AppState;

/// Routes mounted at `/tenants/{tenant_id}/notifications`.
///
/// ```text
/// GET    /              -> list_notifications
/// POST   /              -> create_notification
/// GET    /stats         -> notification_stats
/// DELETE /{id}          -> delete_notification
/// POST   /{id}/send     -> send_now
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(notification::list_notifications).post(notification::create_notification),
        )
        .route("/stats", get(notification::notification_stats))
        .route("/{id}", delete(notification::delete_notification))
        .route("/{id}/send", post(notification::send_now))
}
