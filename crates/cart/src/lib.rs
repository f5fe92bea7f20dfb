//! Go Marketplace Cart - persistent shopping-cart store.
//!
//! Holds the cart in memory, publishes every change to subscribers and
//! mirrors it to device storage in the background.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use go_marketplace_cart::{CartStore, StoreOptions, storage::FileStore};
//! use go_marketplace_core::{NewLineItem, Price, ProductId};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let storage = Arc::new(FileStore::new(".gomarketplace"));
//! let cart = CartStore::open(storage, StoreOptions::default()).await?;
//!
//! cart.subscribe(|snapshot| {
//!     tracing::info!(lines = snapshot.len(), "cart changed");
//! });
//!
//! let id = ProductId::parse("shirt-1")?;
//! cart.add_to_cart(NewLineItem::new(id.clone(), "Shirt", "https://img/shirt.png", Price::from_cents(1000)));
//! cart.increment(&id);
//!
//! assert_eq!(cart.summary().item_count, 2);
//! cart.shutdown().await?;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod codec;
pub mod config;
pub mod error;
mod persist;
pub mod storage;
pub mod store;

pub use config::{CartConfig, ConfigError, DEFAULT_STORAGE_KEY, StorageBackend};
pub use error::{CartError, CodecError, StorageError};
pub use store::{CartStore, RestorePolicy, StoreOptions, Subscription};
