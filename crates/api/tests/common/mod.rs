#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use beacon_core::clock::ManualClock;
use beacon_core::types::LocalTimestamp;
use beacon_db::MemoryStore;
use beacon_push::{NotificationService, PushError, PushPayload, PushSender, SchedulerConfig};
use chrono::NaiveDate;
use http_body_util::BodyExt;
use parking_lot::Mutex;
use tower::ServiceExt;

use beacon_api::config::ServerConfig;
use beacon_api::router::build_app_router;
use beacon_api::state::AppState;

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5173` as CORS origin (matching the dev default)
/// and a 30-second request timeout.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
    }
}

pub fn t0() -> LocalTimestamp {
    NaiveDate::from_ymd_opt(2025, 6, 2)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
}

/// Records every token it was asked to push to.
#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<String>>,
}

impl RecordingSender {
    pub fn sent_tokens(&self) -> Vec<String> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl PushSender for RecordingSender {
    async fn send(&self, token: &str, _payload: &PushPayload) -> Result<(), PushError> {
        self.sent.lock().push(token.to_string());
        Ok(())
    }
}

/// Handles to the pieces behind a test router.
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub sender: Arc<RecordingSender>,
    pub clock: ManualClock,
}

/// Build the full application router over an in-memory store, a recording
/// sender and a manual clock starting at [`t0`].
///
/// Uses [`build_app_router`] so tests exercise the same middleware stack
/// (CORS, request ID, timeout, tracing, panic recovery) that production uses.
pub fn build_test_app() -> (Router, TestContext) {
    let config = test_config();
    let store = Arc::new(MemoryStore::new());
    let sender = Arc::new(RecordingSender::default());
    let clock = ManualClock::new(t0());

    let service = NotificationService::new(
        store.clone(),
        sender.clone(),
        Arc::new(clock.clone()),
        SchedulerConfig::default(),
    );

    let state = AppState {
        service: Arc::new(service),
    };

    let app = build_app_router(state, &config);
    (
        app,
        TestContext {
            store,
            sender,
            clock,
        },
    )
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, Body::empty()).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::POST, uri, Body::from(body.to_string())).await
}

pub async fn post_empty(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::POST, uri, Body::empty()).await
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, Body::empty()).await
}

async fn send(app: Router, method: Method, uri: &str, body: Body) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Read the response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
