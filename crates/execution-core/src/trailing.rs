//! Trailing-stop registry: order id -> peg offset.
//!
//! Entries are created from the first report that identifies an order as a
//! trailing stop. Offset changes go out as move commands and are not written
//! back here.

use dashmap::DashMap;
use rust_decimal::Decimal;

#[derive(Debug, Default)]
pub struct TrailingStopRegistry {
    offsets: DashMap<String, Decimal>,
}

impl TrailingStopRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a trailing stop. An existing entry is left untouched.
    pub fn register(&self, order_id: &str, offset: Decimal) {
        self.offsets.entry(order_id.to_string()).or_insert(offset);
    }

    pub fn offset(&self, order_id: &str) -> Option<Decimal> {
        self.offsets.get(order_id).map(|o| *o)
    }

    pub fn contains(&self, order_id: &str) -> bool {
        self.offsets.contains_key(order_id)
    }

    /// Forget an order that left the registry.
    pub fn remove(&self, order_id: &str) -> Option<Decimal> {
        self.offsets.remove(order_id).map(|(_, offset)| offset)
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}
