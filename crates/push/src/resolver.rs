//! Late-binding audience resolution.

use beacon_core::audience::Audience;
use beacon_core::types::TenantId;
use beacon_db::models::device_token::DeviceToken;
use beacon_db::models::notification::Notification;
use beacon_db::TokenStore;

use crate::error::ServiceError;

/// Turns a targeting directive into the token set at dispatch time.
///
/// Resolution always reads the registry's current state, so a device that
/// logged in after the notification was scheduled is resolved by its new
/// auth state.
pub struct AudienceResolver;

impl AudienceResolver {
    pub async fn resolve<S>(
        store: &S,
        notification: &Notification,
    ) -> Result<Vec<DeviceToken>, ServiceError>
    where
        S: TokenStore + ?Sized,
    {
        let audience = notification.audience()?;
        Self::resolve_target(store, notification.tenant_id, audience).await
    }

    pub async fn resolve_target<S>(
        store: &S,
        tenant_id: TenantId,
        audience: Audience,
    ) -> Result<Vec<DeviceToken>, ServiceError>
    where
        S: TokenStore + ?Sized,
    {
        let tokens = store.find_by_audience(tenant_id, audience).await?;
        tracing::debug!(%tenant_id, %audience, tokens = tokens.len(), "Resolved audience");
        Ok(tokens)
    }
}
