//! Cart store configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `CART_STORAGE_KEY` - Key the cart snapshot is stored under (default: `@GoMarketplace:products`)
//! - `CART_STORAGE_BACKEND` - `file` or `postgres` (default: `file`)
//! - `CART_DATA_DIR` - Directory for the file backend (default: `.gomarketplace`)
//! - `CART_DATABASE_URL` - `PostgreSQL` connection string, falls back to `DATABASE_URL`
//!   (required when the backend is `postgres`)
//! - `CART_RESTORE_POLICY` - `discard` or `strict` (default: `discard`)

use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;

use crate::store::RestorePolicy;

/// Storage key for the whole cart snapshot.
pub const DEFAULT_STORAGE_KEY: &str = "@GoMarketplace:products";

const DEFAULT_DATA_DIR: &str = ".gomarketplace";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Where the cart snapshot is persisted.
///
/// Implements `Debug` manually to redact the database URL.
#[derive(Clone)]
pub enum StorageBackend {
    /// One JSON file per key inside `dir`.
    File { dir: PathBuf },
    /// The `cart_kv` table of a `PostgreSQL` database.
    Postgres { database_url: SecretString },
}

impl std::fmt::Debug for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File { dir } => f.debug_struct("File").field("dir", dir).finish(),
            Self::Postgres { .. } => f
                .debug_struct("Postgres")
                .field("database_url", &"[REDACTED]")
                .finish(),
        }
    }
}

/// Cart store configuration.
#[derive(Debug, Clone)]
pub struct CartConfig {
    /// Key the snapshot is stored under
    pub storage_key: String,
    /// Persistence backend
    pub backend: StorageBackend,
    /// What to do when the persisted cart cannot be read
    pub restore_policy: RestorePolicy,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            backend: StorageBackend::File {
                dir: PathBuf::from(DEFAULT_DATA_DIR),
            },
            restore_policy: RestorePolicy::default(),
        }
    }
}

impl CartConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is invalid, or if the `postgres`
    /// backend is selected without a database URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let storage_key =
            get("CART_STORAGE_KEY").unwrap_or_else(|| DEFAULT_STORAGE_KEY.to_string());
        if storage_key.is_empty() {
            return Err(ConfigError::InvalidEnvVar(
                "CART_STORAGE_KEY".to_string(),
                "must not be empty".to_string(),
            ));
        }

        let backend = match get("CART_STORAGE_BACKEND").as_deref().unwrap_or("file") {
            "file" => StorageBackend::File {
                dir: get("CART_DATA_DIR")
                    .map_or_else(|| PathBuf::from(DEFAULT_DATA_DIR), PathBuf::from),
            },
            "postgres" => StorageBackend::Postgres {
                // Fallback to generic DATABASE_URL
                database_url: get("CART_DATABASE_URL")
                    .or_else(|| get("DATABASE_URL"))
                    .map(SecretString::from)
                    .ok_or_else(|| ConfigError::MissingEnvVar("CART_DATABASE_URL".to_string()))?,
            },
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "CART_STORAGE_BACKEND".to_string(),
                    format!("unknown backend '{other}' (expected 'file' or 'postgres')"),
                ));
            }
        };

        let restore_policy = match get("CART_RESTORE_POLICY").as_deref() {
            None | Some("discard") => RestorePolicy::Discard,
            Some("strict") => RestorePolicy::Strict,
            Some(other) => {
                return Err(ConfigError::InvalidEnvVar(
                    "CART_RESTORE_POLICY".to_string(),
                    format!("unknown policy '{other}' (expected 'discard' or 'strict')"),
                ));
            }
        };

        Ok(Self {
            storage_key,
            backend,
            restore_policy,
        })
    }
}
