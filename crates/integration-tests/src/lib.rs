//! Integration tests for Go Marketplace.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p go-marketplace-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_scenarios` - End-to-end cart flows against memory and file storage
//! - `cart_properties` - Property tests over random operation sequences
//!
//! This module holds the fixtures they share.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use go_marketplace_cart::storage::{KeyValueStore, MemoryStore};
use go_marketplace_cart::{CartStore, StoreOptions};
use go_marketplace_core::{NewLineItem, Price, ProductId};

/// Parse a product ID, panicking on invalid input.
#[must_use]
pub fn product_id(id: &str) -> ProductId {
    ProductId::parse(id).unwrap()
}

/// A catalogue product with a price in cents.
#[must_use]
pub fn product(id: &str, title: &str, cents: u32) -> NewLineItem {
    NewLineItem::new(
        product_id(id),
        title,
        format!("https://cdn.gomarketplace.test/{id}.png"),
        Price::from_cents(cents),
    )
}

/// Open a store with default options over `storage`.
///
/// # Panics
///
/// Panics if the store cannot be opened.
pub async fn open_store(storage: Arc<dyn KeyValueStore>) -> CartStore {
    CartStore::open(storage, StoreOptions::default())
        .await
        .unwrap()
}

/// Open a store over a fresh in-memory backend, returning both.
pub async fn memory_store() -> (CartStore, MemoryStore) {
    let storage = MemoryStore::new();
    let store = open_store(Arc::new(storage.clone())).await;
    (store, storage)
}
