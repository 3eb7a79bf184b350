//! # scale-core: Pure Reconciliation Logic for Scale POS
//!
//! This crate is the **heart** of the smart-scale kiosk. It contains the
//! detection/session reconciliation rules as pure functions and state
//! machines with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Scale POS Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 External Real-Time Feed (scale/vision)          │   │
//! │  │        key → { weight, item, price, timestamp } entries         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ scale-store boundary                   │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    scale-engine (orchestration)                 │   │
//! │  │     start_detection, confirm_current, rescan, checkout, ...     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ scale-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │  filter   │  │ detection │  │   cart    │  │   │
//! │  │   │  Reading  │  │ admission │  │  Episode  │  │CartLedger │  │   │
//! │  │   │  Product  │  │   rules   │  │  machine  │  │  totals   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO CLOCK • NO NETWORK • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Reading, Product, CartItem, SessionRecord, ...)
//! - [`filter`] - Reading admission rules (stale / sentinel / pending / ok)
//! - [`detection`] - Single-episode detection state machine
//! - [`cart`] - Append-only cart ledger with fold-computed totals
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every transition is deterministic - callers pass `now_ms`
//! 2. **No I/O**: Feed, store, and timer access is FORBIDDEN here
//! 3. **One Episode at a Time**: A single `started_at_ms` is authoritative,
//!    which is what makes the stale-reading floor check sound
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use scale_core::filter::{admit, Admission};
//! use scale_core::types::Reading;
//!
//! let reading = Reading {
//!     weight: 1.2,
//!     item_label: "Banana".to_string(),
//!     unit_price: 2.49,
//!     captured_at_ms: 1_700_000_001_000,
//! };
//!
//! // An active episode started one second before the reading was captured,
//! // so the reading is admissible and resolves to a product + weight.
//! match admit(&reading, Some(1_700_000_000_000), &[]) {
//!     Admission::Admissible { product, weight } => {
//!         assert_eq!(product.name, "Banana");
//!         assert_eq!(weight, 1.2);
//!     }
//!     other => panic!("expected admissible, got {:?}", other),
//! }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod detection;
pub mod error;
pub mod filter;
pub mod types;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use scale_core::Reading` instead of
// `use scale_core::types::Reading`

pub use cart::{CartLedger, CheckoutSummary};
pub use detection::{DetectionEpisode, EpisodeStatus, ResolvedItem};
pub use error::{CoreError, CoreResult};
pub use filter::Admission;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Label the external detector publishes when nothing is on the pan.
///
/// ## Why a constant?
/// The detector cannot emit an absent field, so it fills the item slot with
/// this reserved string. It must be treated as "no item present", never as a
/// product named that string. An empty label means the same thing.
pub const NO_ITEM_SENTINEL: &str = "OniGarlicGarlicGarlicGarlicGarlic";

/// Confidence attached to products synthesized from a raw reading when the
/// catalog has no entry for the detected label.
///
/// Confidence is opaque metadata from the external detector; the core carries
/// it for display and never thresholds it.
pub const DEFAULT_CONFIDENCE: f64 = 0.95;

/// Image used for products synthesized from a raw reading.
pub const PLACEHOLDER_IMAGE_URL: &str =
    "https://images.unsplash.com/photo-1560806887-1e4cd0b6cbd6?w=400&h=400&fit=crop";

/// Epoch timestamps with this many decimal digits or fewer are treated as
/// seconds and scaled to milliseconds. Current-era millisecond timestamps
/// have 13 digits; second timestamps stay at 10 digits until 2286.
pub const SECONDS_TIMESTAMP_MAX_DIGITS: u32 = 10;
