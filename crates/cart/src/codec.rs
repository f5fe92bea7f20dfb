//! Text encoding of the persisted cart.
//!
//! The snapshot is stored as a JSON array of line items:
//!
//! ```json
//! [{"id":"a","title":"Shirt","image_url":"u","price":"10","quantity":1}]
//! ```
//!
//! Decoding also accepts `imageUrl` and numeric prices, the shape written by
//! earlier releases of the app.

use go_marketplace_core::{CartSnapshot, LineItem};
use tracing::warn;

use crate::error::CodecError;

/// Encode a snapshot for storage.
///
/// # Errors
///
/// Returns `CodecError::Json` if serialization fails.
pub fn encode(snapshot: &CartSnapshot) -> Result<String, CodecError> {
    Ok(serde_json::to_string(snapshot)?)
}

/// Decode a stored snapshot.
///
/// Lines with a zero quantity, or repeating an earlier product ID, are
/// dropped with a warning.
///
/// # Errors
///
/// Returns `CodecError::Json` if the blob is not a valid list of line items.
pub fn decode(blob: &str) -> Result<CartSnapshot, CodecError> {
    let items: Vec<LineItem> = serde_json::from_str(blob)?;
    let stored = items.len();
    let snapshot = CartSnapshot::from_items(items);
    if snapshot.len() != stored {
        warn!(
            stored,
            kept = snapshot.len(),
            "Dropped invalid lines from stored cart"
        );
    }
    Ok(snapshot)
}
