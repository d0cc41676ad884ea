//! Handlers for the pull path under
//! `/tenants/{tenant_id}/users/{user_id}/notifications`.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use beacon_core::types::{DbId, TenantId};
use serde::Serialize;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Whether a delivery-ledger write changed anything.
#[derive(Debug, Serialize)]
pub struct LedgerUpdate {
    pub notification_id: DbId,
    pub user_id: String,
    pub updated: bool,
}

/// GET /api/v1/tenants/{tenant_id}/users/{user_id}/notifications/pending
///
/// Returned notifications are recorded as delivered and will not be returned
/// again for this user.
pub async fn pending_notifications(
    State(state): State<AppState>,
    Path((tenant_id, user_id)): Path<(TenantId, String)>,
) -> AppResult<impl IntoResponse> {
    let pending = state
        .service
        .pending_notifications_for(tenant_id, &user_id)
        .await?;
    Ok(Json(DataResponse { data: pending }))
}

/// POST /api/v1/tenants/{tenant_id}/users/{user_id}/notifications/{id}/delivered
pub async fn mark_delivered(
    State(state): State<AppState>,
    Path((tenant_id, user_id, notification_id)): Path<(TenantId, String, DbId)>,
) -> AppResult<impl IntoResponse> {
    let updated = state
        .service
        .mark_delivered(tenant_id, notification_id, &user_id)
        .await?;
    Ok(Json(DataResponse {
        data: LedgerUpdate {
            notification_id,
            user_id,
            updated,
        },
    }))
}

/// POST /api/v1/tenants/{tenant_id}/users/{user_id}/notifications/{id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    Path((tenant_id, user_id, notification_id)): Path<(TenantId, String, DbId)>,
) -> AppResult<impl IntoResponse> {
    let updated = state
        .service
        .mark_read(tenant_id, notification_id, &user_id)
        .await?;
    Ok(Json(DataResponse {
        data: LedgerUpdate {
            notification_id,
            user_id,
            updated,
        },
    }))
}
