//! Error types for the cart store.
//!
//! Mutations never fail: they update memory and hand persistence to the
//! background writer. Errors only surface from opening a store, reloading
//! it, or explicitly waiting on the writer with `flush`.

use thiserror::Error;

use crate::config::ConfigError;

/// A key-value backend failed.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Database operation failed.
    #[cfg(feature = "postgres")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failed.
    #[cfg(feature = "postgres")]
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The backend refused the operation.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// A persisted cart blob could not be encoded or decoded.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Malformed cart data: {0}")]
    Json(#[from] serde_json::Error),
}

/// Cart store error.
#[derive(Debug, Error)]
pub enum CartError {
    /// Reading from the storage backend failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The persisted cart could not be decoded.
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// The store could not be configured.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The last persistence attempt before a flush failed.
    #[error("Failed to persist cart revision {revision}: {message}")]
    Persist { revision: u64, message: String },

    /// The background writer is no longer running.
    #[error("Persistence writer stopped")]
    WriterStopped,
}

/// Result type alias for `CartError`.
pub type Result<T> = std::result::Result<T, CartError>;
