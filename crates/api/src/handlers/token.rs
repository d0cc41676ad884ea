//! Handlers for the `/tenants/{tenant_id}/tokens` resource.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use beacon_core::types::TenantId;
use beacon_db::models::device_token::RegisterToken;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/tenants/{tenant_id}/tokens
///
/// Register a device token, or report a login (with `user_id`) or logout
/// (without) on an already registered one.
pub async fn register_token(
    State(state): State<AppState>,
    Path(tenant_id): Path<TenantId>,
    Json(input): Json<RegisterToken>,
) -> AppResult<impl IntoResponse> {
    let token = state.service.register_token(tenant_id, &input).await?;
    Ok(Json(DataResponse { data: token }))
}

/// GET /api/v1/tenants/{tenant_id}/tokens/inconsistencies
pub async fn list_inconsistencies(
    State(state): State<AppState>,
    Path(tenant_id): Path<TenantId>,
) -> AppResult<impl IntoResponse> {
    let tokens = state.service.detect_token_inconsistencies(tenant_id).await?;
    Ok(Json(DataResponse { data: tokens }))
}

/// GET /api/v1/tenants/{tenant_id}/tokens/stats
pub async fn token_stats(
    State(state): State<AppState>,
    Path(tenant_id): Path<TenantId>,
) -> AppResult<impl IntoResponse> {
    let stats = state.service.token_stats(tenant_id).await?;
    Ok(Json(DataResponse { data: stats }))
}

/// POST /api/v1/tenants/{tenant_id}/tokens/cleanup
pub async fn cleanup_tokens(
    State(state): State<AppState>,
    Path(tenant_id): Path<TenantId>,
) -> AppResult<impl IntoResponse> {
    let result = state.service.cleanup_tokens(tenant_id).await?;
    Ok(Json(DataResponse { data: result }))
}
