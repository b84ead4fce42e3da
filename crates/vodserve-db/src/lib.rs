//! Metadata repository for published video assets.
//!
//! The ingestion pipeline only talks to the [`VideoRepository`] trait; the
//! Postgres implementation lives in [`postgres`], and a `test-util` feature
//! provides an in-memory implementation so the pipeline can be exercised
//! without a database.

mod postgres;
mod repository;

#[cfg(any(test, feature = "test-util"))]
pub mod memory;

#[cfg(any(test, feature = "test-util"))]
pub use memory::InMemoryVideoRepository;
pub use postgres::PgVideoRepository;
pub use repository::VideoRepository;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use vodserve_core::AppError;

/// Connect to Postgres and run pending migrations.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| AppError::Internal(format!("Migration failed: {}", e)))?;

    Ok(pool)
}
