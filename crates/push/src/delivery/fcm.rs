//! Firebase Cloud Messaging (HTTP v1) transport.
//!
//! [`FcmSender`] posts one `messages:send` request per token. Configuration is
//! loaded from the environment; if `FCM_PROJECT_ID` or both access token
//! variables are missing, [`FcmConfig::from_env`] returns `None` and callers
//! fall back to [`LogSender`](crate::LogSender).
//!
//! OAuth2 access tokens for FCM expire after about an hour. For a long-running
//! process point `FCM_ACCESS_TOKEN_FILE` at a file that an external refresher
//! (for example `gcloud auth print-access-token` on a timer, or a sidecar)
//! keeps current; the file is re-read on every send. `FCM_ACCESS_TOKEN` is
//! used as-is and stops working once it expires.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use crate::payload::PushPayload;
use crate::sender::{PushError, PushSender};

/// Default FCM API base URL.
const DEFAULT_FCM_ENDPOINT: &str = "https://fcm.googleapis.com";

/// HTTP request timeout for a single send.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// FCM error code for a token whose app instance is gone.
const UNREGISTERED: &str = "UNREGISTERED";

/// FCM error code for any malformed request, token or payload alike.
const INVALID_ARGUMENT: &str = "INVALID_ARGUMENT";

// ---------------------------------------------------------------------------
// AccessToken
// ---------------------------------------------------------------------------

/// Where the bearer token for FCM requests comes from.
#[derive(Debug, Clone)]
pub enum AccessToken {
    /// Fixed token, valid until it expires.
    Static(String),
    /// File holding the current token, read on every send.
    File(PathBuf),
}

impl AccessToken {
    /// The token to send with the next request.
    pub async fn current(&self) -> Result<String, PushError> {
        match self {
            AccessToken::Static(token) => Ok(token.clone()),
            AccessToken::File(path) => {
                let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
                    PushError::Other(format!(
                        "Cannot read FCM access token from {}: {e}",
                        path.display()
                    ))
                })?;
                let token = raw.trim();
                if token.is_empty() {
                    return Err(PushError::Other(format!(
                        "FCM access token file {} is empty",
                        path.display()
                    )));
                }
                Ok(token.to_string())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// FcmConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FcmConfig {
    /// Firebase project the app is registered under.
    pub project_id: String,
    /// OAuth2 bearer token with the `firebase.messaging` scope.
    pub access_token: AccessToken,
    /// API base URL (overridable for tests and proxies).
    pub endpoint: String,
}

impl FcmConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable                | Required | Default                      |
    /// |-------------------------|----------|------------------------------|
    /// | `FCM_PROJECT_ID`        | yes      | none                         |
    /// | `FCM_ACCESS_TOKEN_FILE` | one of   | none                         |
    /// | `FCM_ACCESS_TOKEN`      | one of   | none                         |
    /// | `FCM_ENDPOINT`          | no       | `https://fcm.googleapis.com` |
    ///
    /// When both token variables are set the file wins.
    pub fn from_env() -> Option<Self> {
        let project_id = std::env::var("FCM_PROJECT_ID").ok()?;
        let access_token = match std::env::var("FCM_ACCESS_TOKEN_FILE") {
            Ok(path) => AccessToken::File(PathBuf::from(path)),
            Err(_) => AccessToken::Static(std::env::var("FCM_ACCESS_TOKEN").ok()?),
        };
        Some(Self {
            project_id,
            access_token,
            endpoint: std::env::var("FCM_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_FCM_ENDPOINT.to_string()),
        })
    }

    /// Full `messages:send` URL for this project.
    pub fn send_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/messages:send",
            self.endpoint.trim_end_matches('/'),
            self.project_id
        )
    }
}

// ---------------------------------------------------------------------------
// FcmSender
// ---------------------------------------------------------------------------

pub struct FcmSender {
    client: reqwest::Client,
    config: FcmConfig,
}

impl FcmSender {
    pub fn new(config: FcmConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl PushSender for FcmSender {
    async fn send(&self, token: &str, payload: &PushPayload) -> Result<(), PushError> {
        let access_token = self.config.access_token.current().await?;
        let response = self
            .client
            .post(self.config.send_url())
            .bearer_auth(access_token)
            .json(&payload.to_fcm_message(token))
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(classify_response(status.as_u16(), &body))
    }
}

/// Map a failed FCM response to a [`PushError`].
///
/// - 404 / 410, or an `UNREGISTERED` error code: invalid token.
/// - `INVALID_ARGUMENT` naming the registration token: invalid token. Any
///   other `INVALID_ARGUMENT` is a bad payload and counts as other.
/// - 429 and 5xx: transient.
/// - Anything else: other.
pub fn classify_response(status: u16, body: &str) -> PushError {
    let message = format!("FCM returned HTTP {status}");
    let bad_token = body.contains(INVALID_ARGUMENT)
        && body.to_ascii_lowercase().contains("registration token");
    if status == 404 || status == 410 || body.contains(UNREGISTERED) || bad_token {
        return PushError::InvalidToken(message);
    }
    if status == 429 || (500..600).contains(&status) {
        return PushError::Transient(message);
    }
    PushError::Other(message)
}

fn classify_request_error(err: reqwest::Error) -> PushError {
    if err.is_timeout() || err.is_connect() {
        PushError::Transient(err.to_string())
    } else {
        PushError::Other(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
