use axum::routing::{get, post};
use axum::Router;

use crate::handlers::token;
use crate::state::AppState;

/// Routes mounted at `/tenants/{tenant_id}/tokens`.
///
/// ```text
/// POST   /                  -> register_token
/// GET    /inconsistencies   -> list_inconsistencies
/// GET    /stats             -> token_stats
/// POST   /cleanup           -> cleanup_tokens
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(token::register_token))
        .route("/inconsistencies", get(token::list_inconsistencies))
        .route("/stats", get(token::token_stats))
        .route("/cleanup", post(token::cleanup_tokens))
}
