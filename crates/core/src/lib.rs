//! Go Marketplace Core - Shared cart types.
//!
//! This crate provides the types shared by every Go Marketplace component:
//! - `cart` - The stateful cart store with device persistence
//! - `cli` - Command-line tool for inspecting and editing a persisted cart
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no storage
//! access, no async runtime. This keeps it lightweight and lets the UI layer
//! use the aggregation helpers on any snapshot it already holds.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for product IDs, prices and line items
//! - [`cart`] - The cart snapshot and its state transitions
//! - [`aggregate`] - Total quantity and total price over a snapshot

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod aggregate;
pub mod cart;
pub mod types;

pub use aggregate::{CartSummary, total_price, total_quantity};
pub use cart::CartSnapshot;
pub use types::*;
