//! # Domain Types
//!
//! Core domain types used throughout Scale POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Reading      │   │    Product      │   │    CartItem     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  weight         │   │  id (slug)      │   │  product        │       │
//! │  │  item_label     │   │  name           │   │  weight         │       │
//! │  │  unit_price     │   │  unit_price /kg │   │  total_price    │       │
//! │  │  captured_at_ms │   │  confidence?    │   │  confirmed_at_ms│       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  SessionRecord  │   │ SessionStatus   │   │    Category     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  Active         │   │  Fruit          │       │
//! │  │  items + total  │   │  Completed      │   │  Vegetable      │       │
//! │  │  started/ended  │   │  Cancelled      │   └─────────────────┘       │
//! │  └─────────────────┘   └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Timestamp Convention
//! Every timestamp in the core is an `i64` of epoch **milliseconds**. The
//! external feed sometimes reports epoch seconds; [`normalize_epoch_ms`]
//! folds both shapes into the common unit before any comparison.

use serde::{Deserialize, Serialize};

use crate::{DEFAULT_CONFIDENCE, PLACEHOLDER_IMAGE_URL, SECONDS_TIMESTAMP_MAX_DIGITS};

// =============================================================================
// Reading
// =============================================================================

/// One raw sensor reading from the external scale/vision pipeline.
///
/// Produced externally and immutable once received. Delivery order is not
/// guaranteed and the same snapshot may be redelivered; the admission rules
/// in [`crate::filter`] are what make consuming this safe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    /// Measured weight in kilograms. Zero means nothing has settled yet.
    pub weight: f64,

    /// Detected item label. May carry the no-item sentinel
    /// ([`crate::NO_ITEM_SENTINEL`]) or be empty, both meaning "no item".
    pub item_label: String,

    /// Unit price (per kg) quoted by the detector for the label.
    pub unit_price: f64,

    /// Capture time as reported by the producer. Raw: may be epoch seconds
    /// or epoch milliseconds, see [`normalize_epoch_ms`].
    pub captured_at_ms: i64,
}

// =============================================================================
// Category
// =============================================================================

/// Produce category of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Fruit,
    Vegetable,
}

impl Default for Category {
    /// Synthesized products default to fruit when the detector gives no hint.
    fn default() -> Self {
        Category::Fruit
    }
}

// =============================================================================
// Product
// =============================================================================

/// A sellable product: either a catalog entry or synthesized on the fly from
/// a reading whose label has no catalog match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Slug identifier derived from the name (see [`slugify`]).
    pub id: String,

    /// Display name shown to the clerk and on the receipt.
    pub name: String,

    /// Image shown in the detection panel.
    pub image_url: String,

    /// Price per kilogram.
    pub unit_price: f64,

    /// Produce category.
    pub category: Category,

    /// Detector confidence in [0, 1]. Opaque metadata: carried for display,
    /// never interpreted or thresholded by the core.
    pub confidence: Option<f64>,
}

impl Product {
    /// Builds a product from a detected label with no catalog entry.
    ///
    /// The label becomes the display name, its slug becomes the id, and the
    /// reading's quoted unit price is taken as-is. Category, confidence, and
    /// image fall back to fixed defaults.
    pub fn synthesized(label: &str, unit_price: f64) -> Self {
        Product {
            id: slugify(label),
            name: label.to_string(),
            image_url: PLACEHOLDER_IMAGE_URL.to_string(),
            unit_price,
            category: Category::default(),
            confidence: Some(DEFAULT_CONFIDENCE),
        }
    }
}

/// Derives a product id slug from a display name: lowercased, with every
/// whitespace run collapsed to a single `-`.
pub fn slugify(name: &str) -> String {
    name.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

// =============================================================================
// Timestamp Normalization
// =============================================================================

/// Normalizes a raw epoch timestamp to milliseconds.
///
/// The external producer is inconsistent: some entries carry epoch seconds,
/// some epoch milliseconds. A value with at most
/// [`SECONDS_TIMESTAMP_MAX_DIGITS`] decimal digits is read as seconds and
/// scaled by 1000; anything longer is already milliseconds.
///
/// ## Example
/// ```rust
/// use scale_core::types::normalize_epoch_ms;
///
/// assert_eq!(normalize_epoch_ms(1_700_000_000), 1_700_000_000_000);
/// assert_eq!(normalize_epoch_ms(1_700_000_000_000), 1_700_000_000_000);
/// ```
pub fn normalize_epoch_ms(raw: i64) -> i64 {
    if raw <= 0 {
        return raw;
    }
    if decimal_digits(raw) <= SECONDS_TIMESTAMP_MAX_DIGITS {
        raw.saturating_mul(1000)
    } else {
        raw
    }
}

/// Number of decimal digits in a positive integer.
fn decimal_digits(mut value: i64) -> u32 {
    let mut digits = 1;
    while value >= 10 {
        value /= 10;
        digits += 1;
    }
    digits
}

// =============================================================================
// Cart Item
// =============================================================================

/// A confirmed line in the cart.
///
/// Created only through confirmation and immutable once in the ledger except
/// for removal. The product is a snapshot: later catalog changes do not
/// reprice an already-confirmed line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Product snapshot at confirmation time.
    pub product: Product,

    /// Confirmed weight in kilograms. Always > 0; the admission rules keep
    /// zero-weight readings from ever reaching confirmation.
    pub weight: f64,

    /// Line total: `weight * product.unit_price`, fixed at confirmation.
    pub total_price: f64,

    /// When the clerk confirmed the line (epoch ms).
    pub confirmed_at_ms: i64,
}

impl CartItem {
    /// Creates a confirmed line, computing the total from weight and unit price.
    pub fn new(product: Product, weight: f64, confirmed_at_ms: i64) -> Self {
        let total_price = weight * product.unit_price;
        CartItem {
            product,
            weight,
            total_price,
            confirmed_at_ms,
        }
    }
}

// =============================================================================
// Cart Totals
// =============================================================================

/// Derived cart totals. Always recomputed by folding the item sequence,
/// never maintained as running counters that could drift.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    /// Sum of item weights in kilograms.
    pub weight: f64,

    /// Sum of line totals.
    pub amount: f64,
}

impl CartTotals {
    /// Folds totals over a sequence of confirmed items.
    pub fn from_items(items: &[CartItem]) -> Self {
        CartTotals {
            weight: items.iter().map(|i| i.weight).sum(),
            amount: items.iter().map(|i| i.total_price).sum(),
        }
    }
}

// =============================================================================
// Session Status
// =============================================================================

/// Lifecycle status of a durable kiosk session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Session is open and accumulating confirmed items.
    Active,
    /// Checkout completed the session.
    Completed,
    /// Session was abandoned by store-side intervention.
    Cancelled,
}

impl Default for SessionStatus {
    fn default() -> Self {
        SessionStatus::Active
    }
}

// =============================================================================
// Session Record
// =============================================================================

/// Durable record of one kiosk session, mirrored to the external store.
///
/// ## Ownership
/// The in-memory [`crate::CartLedger`] is authoritative; this record is a
/// best-effort mirror plus lifecycle metadata. It is allowed to fall behind
/// the cart when the store is unavailable and is never read back to "fix"
/// in-memory state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// Store-assigned session id (UUID v4).
    pub id: String,

    /// When detection first started for this session (epoch ms).
    pub started_at_ms: i64,

    /// When the session was completed, if it has been.
    pub ended_at_ms: Option<i64>,

    /// Items mirrored so far, in confirmation order.
    pub items: Vec<CartItem>,

    /// Sum of mirrored line totals, recomputed on every append.
    pub total: f64,

    /// Lifecycle status.
    pub status: SessionStatus,
}

impl SessionRecord {
    /// Creates a fresh active session record.
    pub fn new(id: String, started_at_ms: i64) -> Self {
        SessionRecord {
            id,
            started_at_ms,
            ended_at_ms: None,
            items: Vec::new(),
            total: 0.0,
            status: SessionStatus::Active,
        }
    }

    /// Recomputes the mirrored total from the item sequence.
    pub fn recompute_total(&mut self) {
        self.total = self.items.iter().map(|i| i.total_price).sum();
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Red Apple"), "red-apple");
        assert_eq!(slugify("Banana"), "banana");
        assert_eq!(slugify("  Savoy   Cabbage "), "savoy-cabbage");
    }

    #[test]
    fn test_normalize_epoch_seconds_scaled() {
        // 10 digits: epoch seconds
        assert_eq!(normalize_epoch_ms(1_700_000_000), 1_700_000_000_000);
        // 13 digits: already milliseconds
        assert_eq!(normalize_epoch_ms(1_700_000_000_000), 1_700_000_000_000);
    }

    #[test]
    fn test_normalize_epoch_small_values() {
        // Short values are still "seconds shaped"
        assert_eq!(normalize_epoch_ms(1), 1000);
        // Non-positive values pass through untouched
        assert_eq!(normalize_epoch_ms(0), 0);
        assert_eq!(normalize_epoch_ms(-5), -5);
    }

    #[test]
    fn test_synthesized_product_defaults() {
        let product = Product::synthesized("Dragon Fruit", 12.5);
        assert_eq!(product.id, "dragon-fruit");
        assert_eq!(product.name, "Dragon Fruit");
        assert_eq!(product.unit_price, 12.5);
        assert_eq!(product.category, Category::Fruit);
        assert_eq!(product.confidence, Some(crate::DEFAULT_CONFIDENCE));
        assert_eq!(product.image_url, crate::PLACEHOLDER_IMAGE_URL);
    }

    #[test]
    fn test_cart_item_total_is_weight_times_unit_price() {
        let item = CartItem::new(Product::synthesized("Banana", 2.49), 2.0, 1);
        assert_eq!(item.total_price, 4.98);
    }

    #[test]
    fn test_session_record_total_recompute() {
        let mut record = SessionRecord::new("s-1".to_string(), 1000);
        record
            .items
            .push(CartItem::new(Product::synthesized("Banana", 2.0), 1.0, 1));
        record
            .items
            .push(CartItem::new(Product::synthesized("Orange", 4.0), 0.5, 2));
        record.recompute_total();
        assert_eq!(record.total, 4.0);
    }

    #[test]
    fn test_status_serde_wire_forms() {
        assert_eq!(
            serde_json::to_string(&SessionStatus::Active).unwrap(),
            "\"active\""
        );
        assert_eq!(
            serde_json::to_string(&Category::Vegetable).unwrap(),
            "\"vegetable\""
        );
    }
}
