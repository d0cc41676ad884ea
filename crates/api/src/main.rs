use std::net::SocketAddr;
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

use beacon_api::config::ServerConfig;
use beacon_api::router::build_app_router;
use beacon_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "beacon_api=debug,beacon_push=debug,tower_http=debug".into()
            }),
        )
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer()))
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    let scheduler_config = SchedulerConfig::from_env();
    tracing::info!(
        interval_secs = scheduler_config.interval.as_secs(),
        grace_secs = scheduler_config.grace_secs,
        "Loaded scheduler configuration"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = beacon_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    beacon_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    beacon_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Push provider ---
    let sender: Arc<dyn PushSender> = match FcmConfig::from_env() {
        Some(fcm) => {
            tracing::info!(project_id = %fcm.project_id, "FCM delivery enabled");
            Arc::new(FcmSender::new(fcm).expect("Failed to build FCM HTTP client"))
        }
        None => {
            tracing::warn!("FCM_PROJECT_ID or FCM access token not set, pushes will only be logged");
            Arc::new(LogSender)
        }
    };

    // --- Notification engine ---
    let service = Arc::new(NotificationService::new(
        Arc::new(PgStore::new(pool)),
        sender,
        Arc::new(SystemClock),
        scheduler_config,
    ));

    // Spawn the scheduler sweep loop.
    let scheduler_cancel = CancellationToken::new();
    let scheduler = NotificationScheduler::new(Arc::clone(&service));
    let scheduler_cancel_clone = scheduler_cancel.clone();
    let scheduler_handle = tokio::spawn(async move {
        scheduler.run(scheduler_cancel_clone).await;
    });
    tracing::info!("Notification scheduler started");

    // --- App state ---
    let state = AppState { service };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // An in-flight sweep finishes its current notification before exiting.
    scheduler_cancel.cancel();
    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);
    if tokio::time::timeout(shutdown_timeout, scheduler_handle)
        .await
        .is_err()
    {
        tracing::warn!("Notification scheduler did not stop within the shutdown timeout");
    } else {
        tracing::info!("Notification scheduler stopped");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
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
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
