//! # Cart Ledger
//!
//! In-memory ordered sequence of confirmed cart items plus derived totals.
//!
//! ## Ledger Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Ledger Operations                               │
//! │                                                                         │
//! │  Clerk Action             Engine Call             Ledger Change         │
//! │  ────────────             ───────────             ─────────────         │
//! │                                                                         │
//! │  Confirm item ──────────► add(product, weight) ─► items.push(line)     │
//! │                                                                         │
//! │  Remove line ───────────► remove_at(index) ─────► items.remove(i)      │
//! │                                                                         │
//! │  Clear cart ────────────► clear() ──────────────► items.clear()        │
//! │                                                                         │
//! │  Checkout ──────────────► checkout() ───────────► drain + totals       │
//! │                                                                         │
//! │  NOTE: totals are folded from the sequence on every read. There is no  │
//! │  separately maintained running total that can drift from the items.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Insertion order is display order is receipt order.

use serde::Serialize;

use crate::error::{CoreError, CoreResult};
use crate::types::{CartItem, CartTotals, Product};

// =============================================================================
// Cart Ledger
// =============================================================================

/// Append-only ledger of confirmed items.
///
/// ## Invariants
/// - Items enter only through [`CartLedger::add`] (i.e. clerk confirmation)
/// - Removal preserves the relative order of the remaining items
/// - `totals()` is always a fold over the current sequence
#[derive(Debug, Clone, Default)]
pub struct CartLedger {
    items: Vec<CartItem>,
}

impl CartLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        CartLedger { items: Vec::new() }
    }

    /// Appends a confirmed line.
    ///
    /// Always succeeds: weight > 0 is guaranteed upstream by the admission
    /// rules, so no validation failure is modeled here.
    pub fn add(&mut self, product: Product, weight: f64, confirmed_at_ms: i64) -> &CartItem {
        self.items.push(CartItem::new(product, weight, confirmed_at_ms));
        self.items.last().expect("just pushed")
    }

    /// Removes the line at `index`, preserving the order of the rest.
    ///
    /// Fails with [`CoreError::IndexOutOfRange`] on an invalid index; the
    /// ledger is untouched in that case.
    pub fn remove_at(&mut self, index: usize) -> CoreResult<CartItem> {
        if index >= self.items.len() {
            return Err(CoreError::IndexOutOfRange {
                index,
                len: self.items.len(),
            });
        }
        Ok(self.items.remove(index))
    }

    /// Empties the ledger unconditionally.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Current items in confirmation order.
    #[inline]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Number of lines.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the ledger is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Derived totals, recomputed from the sequence on every call.
    pub fn totals(&self) -> CartTotals {
        CartTotals::from_items(&self.items)
    }

    /// Commits the cart: returns the full item sequence with its totals and
    /// leaves the ledger empty.
    ///
    /// This is the only consumer-visible commit operation. It is not
    /// transactional with the durable session mirror; the mirror catches up
    /// (or doesn't) on its own.
    pub fn checkout(&mut self) -> CheckoutSummary {
        let totals = self.totals();
        CheckoutSummary {
            items: std::mem::take(&mut self.items),
            totals,
        }
    }
}

// =============================================================================
// Checkout Summary
// =============================================================================

/// Everything the receipt layer needs from a checkout.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSummary {
    /// Committed lines in confirmation order (= receipt order).
    pub items: Vec<CartItem>,

    /// Folded totals at commit time.
    pub totals: CartTotals,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Product;

    fn product(name: &str, unit_price: f64) -> Product {
        Product::synthesized(name, unit_price)
    }

    #[test]
    fn test_add_then_remove_leaves_empty_ledger() {
        let mut ledger = CartLedger::new();
        ledger.add(product("Banana", 2.49), 1.0, 1);

        let removed = ledger.remove_at(0).unwrap();
        assert_eq!(removed.product.name, "Banana");
        assert!(ledger.is_empty());
        assert_eq!(ledger.totals(), CartTotals { weight: 0.0, amount: 0.0 });
    }

    #[test]
    fn test_remove_preserves_relative_order() {
        let mut ledger = CartLedger::new();
        ledger.add(product("Apple", 1.0), 1.0, 1);
        ledger.add(product("Banana", 1.0), 1.0, 2);
        ledger.add(product("Carrot", 1.0), 1.0, 3);

        ledger.remove_at(1).unwrap();

        let names: Vec<_> = ledger.items().iter().map(|i| i.product.name.as_str()).collect();
        assert_eq!(names, vec!["Apple", "Carrot"]);
    }

    #[test]
    fn test_remove_out_of_range_is_error_and_no_op() {
        let mut ledger = CartLedger::new();
        ledger.add(product("Apple", 1.0), 1.0, 1);

        assert_eq!(
            ledger.remove_at(5),
            Err(CoreError::IndexOutOfRange { index: 5, len: 1 })
        );
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_totals_fold_over_items() {
        let mut ledger = CartLedger::new();
        ledger.add(product("A", 2.0), 1.0, 1);
        ledger.add(product("B", 4.0), 0.5, 2);

        let totals = ledger.totals();
        assert_eq!(totals.weight, 1.5);
        assert_eq!(totals.amount, 4.0);
    }

    #[test]
    fn test_checkout_returns_items_and_clears() {
        let mut ledger = CartLedger::new();
        ledger.add(product("A", 2.0), 1.0, 1);
        ledger.add(product("B", 4.0), 0.5, 2);
        ledger.add(product("C", 1.5), 2.0, 3);

        let summary = ledger.checkout();
        assert_eq!(summary.items.len(), 3);
        assert_eq!(summary.totals.amount, 7.0);
        assert_eq!(summary.totals.weight, 3.5);
        assert!(ledger.is_empty());

        // A second checkout commits nothing.
        let empty = ledger.checkout();
        assert!(empty.items.is_empty());
        assert_eq!(empty.totals.amount, 0.0);
    }

    #[test]
    fn test_clear_empties_unconditionally() {
        let mut ledger = CartLedger::new();
        ledger.add(product("A", 2.0), 1.0, 1);
        ledger.clear();
        assert!(ledger.is_empty());
    }
}
