//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! CART_STORAGE_BACKEND=postgres CART_DATABASE_URL=postgres://... gm-cart migrate
//! ```

use go_marketplace_cart::storage::{PgStore, create_pool};
use go_marketplace_cart::{CartConfig, StorageBackend};
use thiserror::Error;

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// The configured backend has no schema to migrate.
    #[error("Migrations need CART_STORAGE_BACKEND=postgres")]
    NotPostgres,

    /// Connecting or migrating failed.
    #[error("Storage error: {0}")]
    Storage(#[from] go_marketplace_cart::StorageError),
}

/// Create or update the `cart_kv` table.
///
/// # Errors
///
/// Returns an error if the backend is not `PostgreSQL`, or if connecting or
/// migrating fails.
pub async fn run(config: &CartConfig) -> Result<(), MigrationError> {
    let StorageBackend::Postgres { database_url } = &config.backend else {
        return Err(MigrationError::NotPostgres);
    };

    tracing::info!("Connecting to cart database...");
    let pool = create_pool(database_url).await?;

    tracing::info!("Running cart migrations...");
    PgStore::new(pool).migrate().await?;

    tracing::info!("Cart migrations complete!");
    Ok(())
}
