//! Handlers for the `/tenants/{tenant_id}/notifications` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use beacon_core::types::{DbId, TenantId};
use beacon_db::models::notification::CreateNotification;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/tenants/{tenant_id}/notifications
///
/// Create a notification. It is dispatched immediately unless scheduled more
/// than the grace threshold ahead. Returns 201 with id, status and schedule.
pub async fn create_notification(
    State(state): State<AppState>,
    Path(tenant_id): Path<TenantId>,
    Json(input): Json<CreateNotification>,
) -> AppResult<impl IntoResponse> {
    let created = state.service.create_notification(tenant_id, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: created })))
}

/// GET /api/v1/tenants/{tenant_id}/notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    Path(tenant_id): Path<TenantId>,
) -> AppResult<impl IntoResponse> {
    let notifications = state.service.list_notifications(tenant_id).await?;
    Ok(Json(DataResponse {
        data: notifications,
    }))
}

/// GET /api/v1/tenants/{tenant_id}/notifications/stats
pub async fn notification_stats(
    State(state): State<AppState>,
    Path(tenant_id): Path<TenantId>,
) -> AppResult<impl IntoResponse> {
    let stats = state.service.notification_stats(tenant_id).await?;
    Ok(Json(DataResponse { data: stats }))
}

/// POST /api/v1/tenants/{tenant_id}/notifications/{id}/send
///
/// Dispatch a scheduled notification now. 409 if it was already sent.
pub async fn send_now(
    State(state): State<AppState>,
    Path((tenant_id, id)): Path<(TenantId, DbId)>,
) -> AppResult<impl IntoResponse> {
    let result = state.service.send_now(tenant_id, id).await?;
    Ok(Json(DataResponse { data: result }))
}

/// DELETE /api/v1/tenants/{tenant_id}/notifications/{id}
///
/// Returns 204 No Content, or 404 if the notification does not exist.
pub async fn delete_notification(
    State(state): State<AppState>,
    Path((tenant_id, id)): Path<(TenantId, DbId)>,
) -> AppResult<StatusCode> {
    state.service.delete_notification(tenant_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
