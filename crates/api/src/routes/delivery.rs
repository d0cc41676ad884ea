use axum::routing::{get, post};
use axum::Router;

use crate::handlers::delivery;
use crate::state::AppState;

/// Routes mounted at `/tenants/{tenant_id}/users/{user_id}/notifications`.
///
/// ```text
/// GET    /pending           -> pending_notifications
/// POST   /{id}/delivered    -> mark_delivered
/// POST   /{id}/read         -> mark_read
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/pending", get(delivery::pending_notifications))
        .route("/{id}/delivered", post(delivery::mark_delivered))
        .route("/{id}/read", post(delivery::mark_read))
}
