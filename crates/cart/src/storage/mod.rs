//! Key-value persistence backends.
//!
//! The cart only ever needs two operations on device storage: read the
//! string stored under a key, and overwrite it. Backends:
//!
//! - [`MemoryStore`] - process-local map, for tests and ephemeral carts
//! - [`FileStore`] - one file per key in a data directory
//! - `PgStore` - `cart_kv` table in `PostgreSQL` (`postgres` feature)

mod file;
mod memory;
#[cfg(feature = "postgres")]
mod postgres;

use async_trait::async_trait;

pub use file::FileStore;
pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::{PgStore, create_pool};

use crate::error::StorageError;

/// Asynchronous string key-value storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// Returns `None` if the key has never been set.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}
