//! Cart totals.
//!
//! Pure functions over a snapshot the UI already holds. None of them touch
//! the store.

use crate::cart::CartSnapshot;
use crate::types::{LineItem, Price};

/// Sum of every line's quantity. An empty cart has zero items.
#[must_use]
pub fn total_quantity<'a>(items: impl IntoIterator<Item = &'a LineItem>) -> u64 {
    items
        .into_iter()
        .map(|item| u64::from(item.quantity))
        .sum()
}

/// Sum of `price * quantity` over every line. An empty cart totals zero.
#[must_use]
pub fn total_price<'a>(items: impl IntoIterator<Item = &'a LineItem>) -> Price {
    items.into_iter().map(LineItem::line_total).sum()
}

/// Item count and subtotal, as shown on the cart badge and checkout bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CartSummary {
    pub item_count: u64,
    pub subtotal: Price,
}

impl From<&CartSnapshot> for CartSummary {
    fn from(cart: &CartSnapshot) -> Self {
        Self {
            item_count: total_quantity(cart),
            subtotal: total_price(cart),
        }
    }
}
