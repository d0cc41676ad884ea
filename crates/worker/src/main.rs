//! Standalone scheduler process.
//!
//! Runs only the due-notification sweep, for deployments that keep the API
//! and the scheduler in separate processes. Any number of workers may run
//! against the same database; the dispatch claim keeps each notification to
//! a single send.

use std::sync::Arc;
use std::time::Duration;

use beacon_core::clock::SystemClock;
use beacon_db::PgStore;
use beacon_push::{
    FcmConfig, FcmSender, LogSender, NotificationScheduler, NotificationService, PushSender,
    SchedulerConfig,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How long to wait for an in-flight sweep after a shutdown signal.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "beacon_worker=debug,beacon_push=debug".into()),
        )
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer()))
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .init();

    let config = SchedulerConfig::from_env();
    tracing::info!(
        interval_secs = config.interval.as_secs(),
        claim_lease_secs = config.claim_lease_secs,
        "Worker starting"
    );

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = beacon_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    beacon_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    beacon_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database ready");

    let sender: Arc<dyn PushSender> = match FcmConfig::from_env() {
        Some(fcm) => Arc::new(FcmSender::new(fcm).expect("Failed to build FCM HTTP client")),
        None => {
            tracing::warn!("FCM not configured, pushes will only be logged");
            Arc::new(LogSender)
        }
    };

    let service = Arc::new(NotificationService::new(
        Arc::new(PgStore::new(pool)),
        sender,
        Arc::new(SystemClock),
        config,
    ));
    let scheduler = NotificationScheduler::new(service);

    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    let handle = tokio::spawn(async move {
        scheduler.run(cancel_clone).await;
    });

    shutdown_signal().await;
    cancel.cancel();

    if tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await.is_err() {
        tracing::warn!("Scheduler did not stop within the shutdown timeout");
    }
    tracing::info!("Worker stopped");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
