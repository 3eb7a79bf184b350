//! # Reading Admission Rules
//!
//! Decides what an incoming sensor reading means for the current detection
//! episode. This is the single place where stale-data, no-item, and
//! not-yet-settled readings are told apart; nothing upstream or downstream
//! re-implements these checks.
//!
//! ## Rule Pipeline (order matters)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Reading Admission Pipeline                           │
//! │                                                                         │
//! │  Reading ──► 1. normalize capture time to epoch milliseconds           │
//! │         ──► 2. no active episode?          ──► StaleDiscard            │
//! │         ──► 3. captured ≤ episode start?   ──► StaleDiscard            │
//! │         ──► 4. empty / sentinel label?     ──► SentinelDiscard         │
//! │         ──► 5. weight ≤ 0?                 ──► ZeroWeightPending       │
//! │         ──► 6. catalog lookup or synthesize ─► Admissible              │
//! │                                                                         │
//! │  Rule 4 MUST precede rule 5: the no-item placeholder always reports    │
//! │  weight 0 and must not be read as "item recognized, not settled".      │
//! │                                                                         │
//! │  Rule 3 is the replay guard: the feed happily redelivers the previous  │
//! │  episode's terminal snapshot, and only the timestamp floor rejects it. │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;

use crate::types::{normalize_epoch_ms, Product, Reading};
use crate::NO_ITEM_SENTINEL;

// =============================================================================
// Admission Verdict
// =============================================================================

/// Outcome of running one reading through the admission rules.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "verdict")]
pub enum Admission {
    /// Reading is fresh, names a real item, and the item has settled.
    /// Carries the derived product and the confirmed weight.
    Admissible { product: Product, weight: f64 },

    /// Reading predates the current episode (or no episode is listening).
    StaleDiscard,

    /// Reading carries the no-item placeholder or an empty label.
    SentinelDiscard,

    /// Item is recognized but has not settled on the pan yet; the episode
    /// stays active and waits for a positive weight.
    ZeroWeightPending,
}

// =============================================================================
// Admission Function
// =============================================================================

/// Runs the admission rules for one reading against the current episode.
///
/// Pure: the caller passes the active episode's start time (`None` when no
/// episode is listening) and a catalog snapshot for label lookup.
///
/// ## Arguments
/// * `reading` - The raw reading as delivered by the feed
/// * `episode_started_at_ms` - Start of the active episode, epoch ms, or
///   `None` when idle
/// * `catalog` - Catalog snapshot used to resolve labels to known products
///
/// ## Product Derivation
/// A catalog entry whose name matches the label (ASCII case-insensitive) is
/// authoritative, including its unit price. Unknown labels synthesize a
/// product from the reading via [`Product::synthesized`].
pub fn admit(
    reading: &Reading,
    episode_started_at_ms: Option<i64>,
    catalog: &[Product],
) -> Admission {
    let captured_ms = normalize_epoch_ms(reading.captured_at_ms);

    // Nothing is listening: every reading is stale by definition.
    let Some(started_at_ms) = episode_started_at_ms else {
        return Admission::StaleDiscard;
    };

    // Timestamp floor: rejects redelivery of the previous episode's snapshot.
    if captured_ms <= started_at_ms {
        return Admission::StaleDiscard;
    }

    // Sentinel check precedes the weight check: "no item" always weighs 0.
    if reading.item_label.is_empty() || reading.item_label == NO_ITEM_SENTINEL {
        return Admission::SentinelDiscard;
    }

    if reading.weight <= 0.0 {
        return Admission::ZeroWeightPending;
    }

    let product = lookup_by_label(catalog, &reading.item_label)
        .cloned()
        .unwrap_or_else(|| Product::synthesized(&reading.item_label, reading.unit_price));

    Admission::Admissible {
        product,
        weight: reading.weight,
    }
}

/// Finds a catalog product by display name, ASCII case-insensitive.
fn lookup_by_label<'a>(catalog: &'a [Product], label: &str) -> Option<&'a Product> {
    catalog.iter().find(|p| p.name.eq_ignore_ascii_case(label))
}

// =============================================================================
// Unit Tests
// =============================================================================
