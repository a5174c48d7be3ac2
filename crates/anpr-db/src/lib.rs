//! Postgres access for the detection pipeline.
//!
//! This crate provides:
//! - Pool construction from configuration
//! - The upload-job repository (atomic claim, terminal transitions)
//! - The event repository (insert-only from the pipeline)
//! - The watch repository (active patterns, match inserts)
//!
//! Queries are runtime-bound; schema migrations are owned by the admin
//! surface and out of scope here.

pub mod repositories;

pub use repositories::event_repo::EventRepo;
pub use repositories::job_repo::JobRepo;
pub use repositories::watch_repo::WatchRepo;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

/// Connect a pool to the given database URL.
pub async fn connect(database_url: &str) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;
    info!("Connected to Postgres");
    Ok(pool)
}

/// Connect a pool using the `DATABASE_URL` environment variable.
pub async fn connect_from_env() -> Result<PgPool, sqlx::Error> {
    let url = std::env::var("DATABASE_URL")
        .map_err(|_| sqlx::Error::Configuration("DATABASE_URL not set".into()))?;
    connect(&url).await
}
