//! HTTP-level integration tests for `/tenants/{tenant_id}/notifications`.

mod common;

use axum::http::StatusCode;
use chrono::Duration;
use common::{body_json, build_test_app, delete, get, post_json, t0};
use serde_json::json;
use uuid::Uuid;

fn base(tenant: Uuid) -> String {
    format!("/api/v1/tenants/{tenant}/notifications")
}

fn in_an_hour() -> String {
    (t0() + Duration::hours(1))
        .format("%Y-%m-%dT%H:%M")
        .to_string()
}

async fn register(app: axum::Router, tenant: Uuid, token: &str, user_id: Option<&str>) {
    let response = post_json(
        app,
        &format!("/api/v1/tenants/{tenant}/tokens"),
        json!({
            "token": token,
            "device_id": format!("device-{token}"),
            "platform": "android",
            "user_id": user_id,
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_without_schedule_sends_immediately() {
    let (app, ctx) = build_test_app();
    let tenant = Uuid::new_v4();
    register(app.clone(), tenant, "tok-a", None).await;
    register(app.clone(), tenant, "tok-b", Some("user-1")).await;

    let response = post_json(
        app,
        &base(tenant),
        json!({ "title": "Maintenance", "body": "Back at noon" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "sent");
    assert!(json["data"]["scheduled_time"].is_null());
    assert_eq!(json["data"]["dispatch"]["succeeded"].as_array().unwrap().len(), 2);

    let mut sent = ctx.sender.sent_tokens();
    sent.sort();
    assert_eq!(sent, vec!["tok-a", "tok-b"]);
}

#[tokio::test]
async fn create_with_future_schedule_is_stored_as_scheduled() {
    let (app, ctx) = build_test_app();
    let tenant = Uuid::new_v4();
    register(app.clone(), tenant, "tok-a", None).await;

    let response = post_json(
        app.clone(),
        &base(tenant),
        json!({
            "title": "Sale",
            "message": "Starts soon",
            "type": "warning",
            "target": "guests",
            "scheduled_time": in_an_hour(),
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "scheduled");
    assert_eq!(json["data"]["scheduled_time"], "2025-06-02T10:00:00");
    assert!(json["data"].get("dispatch").is_none());
    assert!(ctx.sender.sent_tokens().is_empty());

    let list = body_json(get(app, &base(tenant)).await).await;
    let rows = list["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["type"], "warning");
    assert_eq!(rows[0]["target"], "guests");
    assert_eq!(rows[0]["body"], "Starts soon");
}

#[tokio::test]
async fn blank_title_is_rejected() {
    let (app, _ctx) = build_test_app();
    let response = post_json(
        app,
        &base(Uuid::new_v4()),
        json!({ "title": "   ", "body": "x" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn unknown_target_is_rejected() {
    let (app, _ctx) = build_test_app();
    let response = post_json(
        app,
        &base(Uuid::new_v4()),
        json!({ "title": "t", "body": "b", "target": "admins" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_schedule_is_rejected() {
    let (app, _ctx) = build_test_app();
    let response = post_json(
        app,
        &base(Uuid::new_v4()),
        json!({ "title": "t", "body": "b", "scheduled_time": "tomorrow" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn non_uuid_tenant_is_rejected() {
    let (app, _ctx) = build_test_app();
    let response = get(app, "/api/v1/tenants/not-a-uuid/notifications").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Send now
// ---------------------------------------------------------------------------

#[tokio::test]
async fn send_now_dispatches_once_then_conflicts() {
    let (app, ctx) = build_test_app();
    let tenant = Uuid::new_v4();
    register(app.clone(), tenant, "tok-a", None).await;

    let created = body_json(
        post_json(
            app.clone(),
            &base(tenant),
            json!({ "title": "t", "body": "b", "scheduled_time": in_an_hour() }),
        )
        .await,
    )
    .await;
    let id = created["data"]["id"].as_i64().unwrap();

    let response = post_json(app.clone(), &format!("{}/{id}/send", base(tenant)), json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["succeeded"].as_array().unwrap().len(), 1);

    let again = post_json(app.clone(), &format!("{}/{id}/send", base(tenant)), json!({})).await;
    assert_eq!(again.status(), StatusCode::CONFLICT);
    assert_eq!(ctx.sender.sent_tokens(), vec!["tok-a"]);

    let stats = body_json(get(app, &format!("{}/stats", base(tenant))).await).await;
    assert_eq!(stats["data"]["sent"], 1);
    assert_eq!(stats["data"]["scheduled"], 0);
}

#[tokio::test]
async fn send_now_unknown_id_returns_404() {
    let (app, _ctx) = build_test_app();
    let response = post_json(
        app,
        &format!("{}/999/send", base(Uuid::new_v4())),
        json!({}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Stats and delete
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stats_count_due_rows() {
    let (app, ctx) = build_test_app();
    let tenant = Uuid::new_v4();

    post_json(
        app.clone(),
        &base(tenant),
        json!({ "title": "t", "body": "b", "scheduled_time": in_an_hour() }),
    )
    .await;
    ctx.clock.advance(Duration::hours(2));

    let response = get(app, &format!("{}/stats", base(tenant))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["total"], 1);
    assert_eq!(json["data"]["scheduled"], 1);
    assert_eq!(json["data"]["due"], 1);
}

#[tokio::test]
async fn delete_returns_204_then_404() {
    let (app, _ctx) = build_test_app();
    let tenant = Uuid::new_v4();

    let created = body_json(
        post_json(
            app.clone(),
            &base(tenant),
            json!({ "title": "t", "body": "b", "scheduled_time": in_an_hour() }),
        )
        .await,
    )
    .await;
    let id = created["data"]["id"].as_i64().unwrap();

    let response = delete(app.clone(), &format!("{}/{id}", base(tenant))).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = delete(app, &format!("{}/{id}", base(tenant))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn notifications_are_scoped_to_their_tenant() {
    let (app, _ctx) = build_test_app();
    let tenant = Uuid::new_v4();
    let other = Uuid::new_v4();

    let created = body_json(
        post_json(
            app.clone(),
            &base(tenant),
            json!({ "title": "t", "body": "b", "scheduled_time": in_an_hour() }),
        )
        .await,
    )
    .await;
    let id = created["data"]["id"].as_i64().unwrap();

    let list = body_json(get(app.clone(), &base(other)).await).await;
    assert!(list["data"].as_array().unwrap().is_empty());

    let response = delete(app, &format!("{}/{id}", base(other))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
