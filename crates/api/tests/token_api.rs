//! HTTP-level integration tests for `/tenants/{tenant_id}/tokens`.

mod common;

use axum::http::StatusCode;
use beacon_db::models::device_token::DeviceToken;
use common::{body_json, build_test_app, get, post_empty, post_json, t0};
use serde_json::json;
use uuid::Uuid;

fn base(tenant: Uuid) -> String {
    format!("/api/v1/tenants/{tenant}/tokens")
}

fn raw_token(
    tenant: Uuid,
    token: &str,
    device_id: Option<&str>,
    user_id: Option<&str>,
    auth: bool,
) -> DeviceToken {
    DeviceToken {
        id: 0,
        tenant_id: tenant,
        token: token.to_string(),
        device_id: device_id.map(str::to_string),
        platform: "ios".to_string(),
        user_id: user_id.map(str::to_string),
        user_email: None,
        is_authenticated: auth,
        created_at: t0(),
        updated_at: t0(),
    }
}

#[tokio::test]
async fn register_then_login_then_logout() {
    let (app, _ctx) = build_test_app();
    let tenant = Uuid::new_v4();

    let response = post_json(
        app.clone(),
        &base(tenant),
        json!({ "token": "tok-1", "device_id": "dev-1", "platform": "android" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["is_authenticated"], false);
    assert!(json["data"]["user_id"].is_null());

    let json = body_json(
        post_json(
            app.clone(),
            &base(tenant),
            json!({
                "token": "tok-1",
                "device_id": "dev-1",
                "platform": "android",
                "user_id": "user-7",
                "user_email": "u7@example.com",
            }),
        )
        .await,
    )
    .await;
    assert_eq!(json["data"]["is_authenticated"], true);
    assert_eq!(json["data"]["user_id"], "user-7");
    assert_eq!(json["data"]["user_email"], "u7@example.com");

    let json = body_json(
        post_json(
            app.clone(),
            &base(tenant),
            json!({ "token": "tok-1", "device_id": "dev-1", "platform": "android", "user_id": "  " }),
        )
        .await,
    )
    .await;
    assert_eq!(json["data"]["is_authenticated"], false);
    assert!(json["data"]["user_id"].is_null());
    assert!(json["data"]["user_email"].is_null());

    let stats = body_json(get(app, &format!("{}/stats", base(tenant))).await).await;
    assert_eq!(stats["data"]["total"], 1);
    assert_eq!(stats["data"]["guests"], 1);
    assert_eq!(stats["data"]["authenticated"], 0);
}

#[tokio::test]
async fn register_with_blank_device_id_is_rejected() {
    let (app, _ctx) = build_test_app();
    let response = post_json(
        app,
        &base(Uuid::new_v4()),
        json!({ "token": "tok-1", "device_id": " ", "platform": "android" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn inconsistencies_lists_mismatched_rows() {
    let (app, ctx) = build_test_app();
    let tenant = Uuid::new_v4();
    ctx.store
        .insert_raw_token(raw_token(tenant, "ok", Some("d1"), Some("u1"), true));
    ctx.store
        .insert_raw_token(raw_token(tenant, "flag-only", Some("d2"), None, true));
    ctx.store
        .insert_raw_token(raw_token(tenant, "user-only", Some("d3"), Some("u3"), false));

    let response = get(app, &format!("{}/inconsistencies", base(tenant))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let mut tokens: Vec<&str> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["token"].as_str().unwrap())
        .collect();
    tokens.sort();
    assert_eq!(tokens, vec!["flag-only", "user-only"]);
}

#[tokio::test]
async fn cleanup_removes_deviceless_and_duplicate_tokens() {
    let (app, ctx) = build_test_app();
    let tenant = Uuid::new_v4();
    ctx.store
        .insert_raw_token(raw_token(tenant, "orphan", None, None, false));
    ctx.store
        .insert_raw_token(raw_token(tenant, "old", Some("shared"), None, false));
    let mut newer = raw_token(tenant, "new", Some("shared"), None, false);
    newer.updated_at = t0() + chrono::Duration::minutes(5);
    ctx.store.insert_raw_token(newer);

    let response = post_empty(app, &format!("{}/cleanup", base(tenant))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["removed_without_device"], 1);
    assert_eq!(json["data"]["removed_duplicates"], 1);

    let remaining: Vec<String> = ctx
        .store
        .tokens_for(tenant)
        .into_iter()
        .map(|t| t.token)
        .collect();
    assert_eq!(remaining, vec!["new"]);
}
