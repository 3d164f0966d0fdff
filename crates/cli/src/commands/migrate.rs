//! Database migration commands.
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - storefront database (falls back to `DATABASE_URL`)
//! - `CATALOG_DATABASE_URL` - product catalog database
//!
//! # Migration Files
//!
//! Storefront migrations: `crates/storefront/migrations/`
//! Catalog migrations: `crates/storefront/catalog_migrations/`

use secrecy::ExposeSecret;
use sqlx::PgPool;

use super::{MissingEnvVar, database_url};

#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error(transparent)]
    MissingEnvVar(#[from] MissingEnvVar),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run storefront database migrations.
///
/// # Errors
///
/// Returns an error if the URL is missing, the database is unreachable or a
/// migration fails.
pub async fn store() -> Result<(), MigrationError> {
    let url = database_url(&["STOREFRONT_DATABASE_URL", "DATABASE_URL"])?;

    tracing::info!("Connecting to storefront database...");
    let pool = PgPool::connect(url.expose_secret()).await?;

    tracing::info!("Running storefront migrations...");
    sqlx::migrate!("../storefront/migrations").run(&pool).await?;

    tracing::info!("Storefront migrations complete!");
    Ok(())
}

/// Run product catalog migrations.
///
/// # Errors
///
/// Returns an error if the URL is missing, the database is unreachable or a
/// migration fails.
pub async fn catalog() -> Result<(), MigrationError> {
    let url = database_url(&["CATALOG_DATABASE_URL"])?;

    tracing::info!("Connecting to catalog database...");
    let pool = PgPool::connect(url.expose_secret()).await?;

    tracing::info!("Running catalog migrations...");
    sqlx::migrate!("../storefront/catalog_migrations")
        .run(&pool)
        .await?;

    tracing::info!("Catalog migrations complete!");
    Ok(())
}
