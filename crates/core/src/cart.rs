//! The cart snapshot and its state transitions.
//!
//! A [`CartSnapshot`] is an ordered list of [`LineItem`]s, unique by product
//! ID, where every line holds at least one unit. Snapshots are values: every
//! transition returns a new snapshot and leaves the receiver untouched, so a
//! snapshot handed to a subscriber never changes underneath it.
//!
//! Transitions that target a single product return `None` when no line
//! matches, which lets the caller skip notifying and persisting.

use serde::{Deserialize, Deserializer, Serialize};

use crate::types::{LineItem, NewLineItem, ProductId};

/// An ordered, duplicate-free list of cart lines.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct CartSnapshot {
    items: Vec<LineItem>,
}

impl CartSnapshot {
    /// An empty cart.
    #[must_use]
    pub const fn empty() -> Self {
        Self { items: Vec::new() }
    }

    /// Build a snapshot from raw lines, restoring the cart invariants.
    ///
    /// Lines with a quantity of zero are dropped, and when two lines share a
    /// product ID only the first is kept. Order is otherwise preserved.
    #[must_use]
    pub fn from_items(items: Vec<LineItem>) -> Self {
        let mut kept: Vec<LineItem> = Vec::with_capacity(items.len());
        for item in items {
            if item.quantity == 0 || kept.iter().any(|k| k.id == item.id) {
                continue;
            }
            kept.push(item);
        }
        Self { items: kept }
    }

    /// The lines in insertion order.
    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Consume the snapshot, returning its lines.
    #[must_use]
    pub fn into_items(self) -> Vec<LineItem> {
        self.items
    }

    /// Look up the line for a product.
    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<&LineItem> {
        self.items.iter().find(|item| item.id == *id)
    }

    /// Number of distinct products in the cart.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add one unit of `candidate`.
    ///
    /// If the product is already in the cart its quantity goes up by one and
    /// every stored field, price included, is kept as it was. Otherwise the
    /// candidate is appended with a quantity of one.
    #[must_use]
    pub fn with_added(&self, candidate: NewLineItem) -> Self {
        if self.get(&candidate.id).is_some() {
            return self.map_matching(&candidate.id, |item| LineItem {
                quantity: item.quantity.saturating_add(1),
                ..item.clone()
            });
        }

        let mut items = self.items.clone();
        items.push(candidate.into_line_item());
        Self { items }
    }

    /// Add one unit to an existing line.
    #[must_use]
    pub fn with_incremented(&self, id: &ProductId) -> Option<Self> {
        self.get(id)?;
        Some(self.map_matching(id, |item| LineItem {
            quantity: item.quantity.saturating_add(1),
            ..item.clone()
        }))
    }

    /// Take one unit off an existing line, removing it when none are left.
    #[must_use]
    pub fn with_decremented(&self, id: &ProductId) -> Option<Self> {
        self.get(id)?;
        Some(
            self.map_matching(id, |item| LineItem {
                quantity: item.quantity.saturating_sub(1),
                ..item.clone()
            })
            .pruned(),
        )
    }

    /// Set a line's quantity outright. A quantity of zero removes the line.
    #[must_use]
    pub fn with_quantity(&self, id: &ProductId, quantity: u32) -> Option<Self> {
        self.get(id)?;
        Some(
            self.map_matching(id, |item| LineItem {
                quantity,
                ..item.clone()
            })
            .pruned(),
        )
    }

    /// Drop a line regardless of its quantity.
    #[must_use]
    pub fn with_removed(&self, id: &ProductId) -> Option<Self> {
        self.get(id)?;
        Some(Self {
            items: self
                .items
                .iter()
                .filter(|item| item.id != *id)
                .cloned()
                .collect(),
        })
    }

    fn map_matching(&self, id: &ProductId, f: impl Fn(&LineItem) -> LineItem) -> Self {
        Self {
            items: self
                .items
                .iter()
                .map(|item| if item.id == *id { f(item) } else { item.clone() })
                .collect(),
        }
    }

    fn pruned(mut self) -> Self {
        self.items.retain(|item| item.quantity > 0);
        self
    }
}

impl<'de> Deserialize<'de> for CartSnapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<LineItem>::deserialize(deserializer).map(Self::from_items)
    }
}

impl<'a> IntoIterator for &'a CartSnapshot {
    type Item = &'a LineItem;
    type IntoIter = std::slice::Iter<'a, LineItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::types::Price;

    fn id(s: &str) -> ProductId {
        ProductId::parse(s).unwrap()
    }

    fn candidate(s: &str, cents: u32) -> NewLineItem {
        NewLineItem::new(
            id(s),
            format!("Product {s}"),
            format!("https://img/{s}"),
            Price::from_cents(cents),
        )
    }

    fn quantities(cart: &CartSnapshot) -> Vec<(&str, u32)> {
        cart.items()
            .iter()
            .map(|item| (item.id.as_str(), item.quantity))
            .collect()
    }

    #[test]
    fn test_add_new_item_appends_with_quantity_one() {
        let cart = CartSnapshot::empty().with_added(candidate("a", 1000));
        assert_eq!(cart.len(), 1);
        let item = &cart.items()[0];
        assert_eq!(item.id, "a");
        assert_eq!(item.title, "Product a");
        assert_eq!(item.image_url, "https://img/a");
        assert_eq!(item.price, Price::from_cents(1000));
        assert_eq!(item.quantity, 1);
    }

    #[test]
    fn test_add_existing_item_merges() {
        let cart = CartSnapshot::empty()
            .with_added(candidate("a", 1000))
            .with_added(candidate("a", 1000));
        assert_eq!(quantities(&cart), vec![("a", 2)]);
    }

    #[test]
    fn test_add_existing_keeps_stored_fields() {
        let mut changed = candidate("a", 9900);
        changed.title = "Renamed".to_string();
        let cart = CartSnapshot::empty()
            .with_added(candidate("a", 1000))
            .with_added(changed);
        let item = &cart.items()[0];
        assert_eq!(item.price, Price::from_cents(1000));
        assert_eq!(item.title, "Product a");
        assert_eq!(item.quantity, 2);
    }

    #[test]
    fn test_add_preserves_order_and_other_lines() {
        let cart = CartSnapshot::empty()
            .with_added(candidate("a", 100))
            .with_added(candidate("b", 200))
            .with_added(candidate("c", 300))
            .with_added(candidate("b", 200));
        assert_eq!(quantities(&cart), vec![("a", 1), ("b", 2), ("c", 1)]);
        assert_eq!(cart.items()[0].price, Price::from_cents(100));
        assert_eq!(cart.items()[2].title, "Product c");
    }

    #[test]
    fn test_transitions_leave_receiver_untouched() {
        let before = CartSnapshot::empty().with_added(candidate("a", 100));
        let _after = before.with_incremented(&id("a")).unwrap();
        assert_eq!(quantities(&before), vec![("a", 1)]);
    }

    #[test]
    fn test_increment() {
        let cart = CartSnapshot::empty()
            .with_added(candidate("a", 100))
            .with_added(candidate("b", 100));
        let cart = cart.with_incremented(&id("b")).unwrap();
        assert_eq!(quantities(&cart), vec![("a", 1), ("b", 2)]);
    }

    #[test]
    fn test_decrement_to_zero_removes() {
        let cart = CartSnapshot::empty()
            .with_added(candidate("a", 100))
            .with_added(candidate("a", 100));
        let cart = cart.with_decremented(&id("a")).unwrap();
        assert_eq!(quantities(&cart), vec![("a", 1)]);
        let cart = cart.with_decremented(&id("a")).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_miss_returns_none() {
        let cart = CartSnapshot::empty().with_added(candidate("a", 100));
        let missing = id("nope");
        assert!(cart.with_incremented(&missing).is_none());
        assert!(cart.with_decremented(&missing).is_none());
        assert!(cart.with_quantity(&missing, 4).is_none());
        assert!(cart.with_removed(&missing).is_none());
    }

    #[test]
    fn test_with_quantity() {
        let cart = CartSnapshot::empty()
            .with_added(candidate("a", 100))
            .with_added(candidate("b", 100));
        let cart = cart.with_quantity(&id("a"), 5).unwrap();
        assert_eq!(quantities(&cart), vec![("a", 5), ("b", 1)]);
        let cart = cart.with_quantity(&id("a"), 0).unwrap();
        assert_eq!(quantities(&cart), vec![("b", 1)]);
    }

    #[test]
    fn test_with_removed() {
        let cart = CartSnapshot::empty()
            .with_added(candidate("a", 100))
            .with_added(candidate("b", 100))
            .with_added(candidate("a", 100));
        let cart = cart.with_removed(&id("a")).unwrap();
        assert_eq!(quantities(&cart), vec![("b", 1)]);
    }

    #[test]
    fn test_from_items_restores_invariants() {
        let mut zero = candidate("z", 100).into_line_item();
        zero.quantity = 0;
        let mut dup = candidate("a", 500).into_line_item();
        dup.quantity = 7;
        let items = vec![
            candidate("a", 100).into_line_item(),
            zero,
            candidate("b", 200).into_line_item(),
            dup,
        ];
        let cart = CartSnapshot::from_items(items);
        assert_eq!(quantities(&cart), vec![("a", 1), ("b", 1)]);
        assert_eq!(cart.items()[0].price, Price::from_cents(100));
    }

    #[test]
    fn test_deserialize_applies_invariants() {
        let json = r#"[
            {"id":"a","title":"A","image_url":"u","price":10,"quantity":0},
            {"id":"b","title":"B","image_url":"u","price":5,"quantity":2}
        ]"#;
        let cart: CartSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(quantities(&cart), vec![("b", 2)]);
    }
}
