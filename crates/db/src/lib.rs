//! Persistence layer for the notification engine.
//!
//! - [`repositories`]: zero-sized Postgres repositories taking `&PgPool`.
//! - [`store`]: the store traits the engine depends on, and [`PgStore`],
//!   which implements them over the repositories.
//! - [`memory`]: [`MemoryStore`], an in-process implementation of the same
//!   traits for tests and local runs without a database.

use sqlx::postgres::PgPoolOptions;

pub mod memory;
pub mod models;
pub mod repositories;
pub mod store;

pub use memory::MemoryStore;
pub use store::{DeliveryStore, NotificationStore, PgStore, Store, TokenStore};

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Verify the database answers a trivial query.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply pending schema migrations from `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}
