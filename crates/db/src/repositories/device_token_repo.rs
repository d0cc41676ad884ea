//! Repository for the `device_tokens` table.

use beacon_core::audience::Audience;
use beacon_core::types::{LocalTimestamp, TenantId};
use sqlx::PgPool;

use crate::models::device_token::{DeviceToken, TokenCleanup, TokenStats, TokenUpsert};

/// Column list for `device_tokens` queries.
const COLUMNS: &str = "id, tenant_id, token, device_id, platform, user_id, user_email, \
                       is_authenticated, created_at, updated_at";

/// SQL mirror of [`beacon_core::audience::is_authenticated_member`].
const AUTHENTICATED_PREDICATE: &str = "(is_authenticated = true AND COALESCE(user_id, '') <> '')";

/// SQL mirror of [`beacon_core::audience::is_guest_member`].
const GUEST_PREDICATE: &str = "(is_authenticated = false OR COALESCE(user_id, '') = '')";

/// SQL mirror of [`beacon_core::audience::is_inconsistent`].
const INCONSISTENT_PREDICATE: &str = "((is_authenticated = true AND COALESCE(user_id, '') = '') \
     OR (is_authenticated = false AND COALESCE(user_id, '') <> ''))";

/// Provides registration, audience and maintenance queries for device tokens.
pub struct DeviceTokenRepo;

impl DeviceTokenRepo {
    /// Insert a token or overwrite the auth state of an existing one.
    ///
    /// On conflict with (`tenant_id`, `token`) only `user_id`, `user_email`,
    /// `is_authenticated` and `updated_at` change; `device_id` and `platform`
    /// keep their first-registered values.
    pub async fn upsert(
        pool: &PgPool,
        tenant_id: TenantId,
        input: &TokenUpsert<'_>,
        now: LocalTimestamp,
    ) -> Result<DeviceToken, sqlx::Error> {
        let query = format!(
            "INSERT INTO device_tokens \
                (tenant_id, token, device_id, platform, user_id, user_email, \
                 is_authenticated, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8) \
             ON CONFLICT (tenant_id, token) DO UPDATE SET \
                user_id = EXCLUDED.user_id, \
                user_email = EXCLUDED.user_email, \
                is_authenticated = EXCLUDED.is_authenticated, \
                updated_at = EXCLUDED.updated_at \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DeviceToken>(&query)
            .bind(tenant_id)
            .bind(input.token)
            .bind(input.device_id)
            .bind(input.platform)
            .bind(input.user_id)
            .bind(input.user_email())
            .bind(input.is_authenticated())
            .bind(now)
            .fetch_one(pool)
            .await
    }

    /// List the tenant's tokens that belong to `audience`.
    pub async fn find_by_audience(
        pool: &PgPool,
        tenant_id: TenantId,
        audience: Audience,
    ) -> Result<Vec<DeviceToken>, sqlx::Error> {
        let filter = match audience {
            Audience::All => String::new(),
            Audience::Authenticated => format!("AND {AUTHENTICATED_PREDICATE}"),
            Audience::Guests => format!("AND {GUEST_PREDICATE}"),
        };
        let query = format!(
            "SELECT {COLUMNS} FROM device_tokens \
             WHERE tenant_id = $1 {filter} \
             ORDER BY id"
        );
        sqlx::query_as::<_, DeviceToken>(&query)
            .bind(tenant_id)
            .fetch_all(pool)
            .await
    }

    /// List tokens whose auth flag disagrees with their user id. Read-only.
    pub async fn find_inconsistent(
        pool: &PgPool,
        tenant_id: TenantId,
    ) -> Result<Vec<DeviceToken>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM device_tokens \
             WHERE tenant_id = $1 AND {INCONSISTENT_PREDICATE} \
             ORDER BY id"
        );
        sqlx::query_as::<_, DeviceToken>(&query)
            .bind(tenant_id)
            .fetch_all(pool)
            .await
    }

    /// Count the tenant's tokens by audience.
    pub async fn stats(pool: &PgPool, tenant_id: TenantId) -> Result<TokenStats, sqlx::Error> {
        let query = format!(
            "SELECT \
                COUNT(*) AS total, \
                COUNT(*) FILTER (WHERE {AUTHENTICATED_PREDICATE}) AS authenticated, \
                COUNT(*) FILTER (WHERE {GUEST_PREDICATE}) AS guests, \
                COUNT(DISTINCT device_id) AS unique_devices, \
                COUNT(*) FILTER (WHERE {INCONSISTENT_PREDICATE}) AS inconsistent \
             FROM device_tokens WHERE tenant_id = $1"
        );
        sqlx::query_as::<_, TokenStats>(&query)
            .bind(tenant_id)
            .fetch_one(pool)
            .await
    }

    /// Remove tokens without a device id, then keep only the most recently
    /// updated token per device. Both deletes run in one transaction.
    pub async fn cleanup(pool: &PgPool, tenant_id: TenantId) -> Result<TokenCleanup, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let without_device = sqlx::query(
            "DELETE FROM device_tokens \
             WHERE tenant_id = $1 AND (device_id IS NULL OR device_id = '')",
        )
        .bind(tenant_id)
        .execute(&mut *tx)
        .await?;

        let duplicates = sqlx::query(
            "DELETE FROM device_tokens d \
             USING ( \
                SELECT id, ROW_NUMBER() OVER ( \
                    PARTITION BY device_id \
                    ORDER BY updated_at DESC, created_at DESC, id DESC \
                ) AS rn \
                FROM device_tokens WHERE tenant_id = $1 \
             ) ranked \
             WHERE d.id = ranked.id AND ranked.rn > 1",
        )
        .bind(tenant_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(TokenCleanup {
            removed_without_device: without_device.rows_affected(),
            removed_duplicates: duplicates.rows_affected(),
        })
    }
}
