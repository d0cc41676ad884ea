//! Device token registry against a real Postgres.
//!
//! Needs `DATABASE_URL`; run with `cargo test -p beacon-db -- --ignored`.

use beacon_core::audience::Audience;
use beacon_db::models::device_token::TokenUpsert;
use beacon_db::repositories::DeviceTokenRepo;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use sqlx::PgPool;
use uuid::Uuid;

fn t0() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, 1)
        .unwrap()
        .and_hms_opt(8, 0, 0)
        .unwrap()
}

fn guest<'a>(token: &'a str, device: &'a str) -> TokenUpsert<'a> {
    TokenUpsert {
        token,
        device_id: device,
        platform: "android",
        user_id: None,
        user_email: None,
    }
}

async fn insert_raw(
    pool: &PgPool,
    tenant: Uuid,
    token: &str,
    device: Option<&str>,
    auth: bool,
    user: Option<&str>,
) {
    sqlx::query(
        "INSERT INTO device_tokens \
            (tenant_id, token, device_id, platform, user_id, is_authenticated, created_at, updated_at) \
         VALUES ($1, $2, $3, 'ios', $4, $5, $6, $6)",
    )
    .bind(tenant)
    .bind(token)
    .bind(device)
    .bind(user)
    .bind(auth)
    .bind(t0())
    .execute(pool)
    .await
    .unwrap();
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn upsert_updates_auth_state_in_place(pool: PgPool) {
    let tenant = Uuid::new_v4();
    let first = DeviceTokenRepo::upsert(&pool, tenant, &guest("tok", "dev-1"), t0())
        .await
        .unwrap();
    assert!(!first.is_authenticated);

    let login = TokenUpsert {
        device_id: "dev-2",
        user_id: Some("u1"),
        user_email: Some("u1@example.com"),
        ..guest("tok", "dev-1")
    };
    let later = t0() + Duration::minutes(3);
    let second = DeviceTokenRepo::upsert(&pool, tenant, &login, later).await.unwrap();

    assert_eq!(second.id, first.id);
    assert!(second.is_authenticated);
    assert_eq!(second.user_id.as_deref(), Some("u1"));
    assert_eq!(second.device_id.as_deref(), Some("dev-1"));
    assert_eq!(second.updated_at, later);

    let stats = DeviceTokenRepo::stats(&pool, tenant).await.unwrap();
    assert_eq!(stats.total, 1);
    assert_eq!(stats.authenticated, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn audience_predicates_match_core(pool: PgPool) {
    let tenant = Uuid::new_v4();
    insert_raw(&pool, tenant, "auth", Some("d1"), true, Some("u1")).await;
    insert_raw(&pool, tenant, "guest", Some("d2"), false, None).await;
    insert_raw(&pool, tenant, "flag-only", Some("d3"), true, None).await;
    insert_raw(&pool, tenant, "stray-user", Some("d4"), false, Some("u9")).await;

    let names = |rows: Vec<beacon_db::models::device_token::DeviceToken>| {
        rows.into_iter().map(|t| t.token).collect::<Vec<_>>()
    };

    let auth = DeviceTokenRepo::find_by_audience(&pool, tenant, Audience::Authenticated)
        .await
        .unwrap();
    assert_eq!(names(auth), vec!["auth"]);

    let guests = DeviceTokenRepo::find_by_audience(&pool, tenant, Audience::Guests)
        .await
        .unwrap();
    assert_eq!(names(guests), vec!["guest", "flag-only", "stray-user"]);

    let inconsistent = DeviceTokenRepo::find_inconsistent(&pool, tenant).await.unwrap();
    assert_eq!(names(inconsistent), vec!["flag-only", "stray-user"]);

    let stats = DeviceTokenRepo::stats(&pool, tenant).await.unwrap();
    assert_eq!(
        (stats.total, stats.authenticated, stats.guests, stats.inconsistent),
        (4, 1, 3, 2)
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn cleanup_keeps_newest_token_per_device(pool: PgPool) {
    let tenant = Uuid::new_v4();
    insert_raw(&pool, tenant, "orphan", None, false, None).await;
    DeviceTokenRepo::upsert(&pool, tenant, &guest("old", "phone"), t0())
        .await
        .unwrap();
    DeviceTokenRepo::upsert(&pool, tenant, &guest("new", "phone"), t0() + Duration::hours(1))
        .await
        .unwrap();

    let result = DeviceTokenRepo::cleanup(&pool, tenant).await.unwrap();
    assert_eq!(result.removed_without_device, 1);
    assert_eq!(result.removed_duplicates, 1);

    let left = DeviceTokenRepo::find_by_audience(&pool, tenant, Audience::All)
        .await
        .unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].token, "new");
}
