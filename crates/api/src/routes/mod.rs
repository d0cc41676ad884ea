pub mod delivery;
pub mod health;
pub mod notification;
pub mod token;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /tenants/{tenant_id}/notifications                         list, create
/// /tenants/{tenant_id}/notifications/stats                   counts by status
/// /tenants/{tenant_id}/notifications/{id}                    delete
/// /tenants/{tenant_id}/notifications/{id}/send               send now (POST)
///
/// /tenants/{tenant_id}/tokens                                register (POST)
/// /tenants/{tenant_id}/tokens/inconsistencies                diagnostics (GET)
/// /tenants/{tenant_id}/tokens/stats                          counts by audience
/// /tenants/{tenant_id}/tokens/cleanup                        maintenance sweep (POST)
///
/// /tenants/{tenant_id}/users/{user_id}/notifications/pending          pull path
/// /tenants/{tenant_id}/users/{user_id}/notifications/{id}/delivered   (POST)
/// /tenants/{tenant_id}/users/{user_id}/notifications/{id}/read        (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/tenants/{tenant_id}/notifications", notification::router())
        .nest("/tenants/{tenant_id}/tokens", token::router())
        .nest(
            "/tenants/{tenant_id}/users/{user_id}/notifications",
            delivery::router(),
        )
}
