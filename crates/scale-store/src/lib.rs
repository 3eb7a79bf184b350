//! # scale-store: External-Collaborator Boundaries for Scale POS
//!
//! Every dependency on the outside world lives behind a trait in this crate,
//! so the reconciliation engine can be wired against production stores, an
//! in-memory stand-in, or a deliberately broken fake in tests.
//!
//! ## Boundaries
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        scale-store Boundaries                           │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │  ReadingFeed   │  │  SessionStore  │  │    ProductCatalog      │    │
//! │  │  (feed.rs)     │  │  (session.rs)  │  │    (catalog.rs)        │    │
//! │  │                │  │                │  │                        │    │
//! │  │ push sub +     │  │ best-effort    │  │ snapshot lookup +      │    │
//! │  │ latest-entry   │  │ durable mirror │  │ one-shot seeding       │    │
//! │  │ selection      │  │                │  │                        │    │
//! │  └────────────────┘  └────────────────┘  └────────────────────────┘    │
//! │                                                                         │
//! │  Every boundary ships an in-memory implementation with the SAME        │
//! │  delivery quirks as the hosted store (duplicates, stale snapshots,     │
//! │  silent degradation), so tests exercise the real failure modes.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod error;
pub mod feed;
pub mod session;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use catalog::{seed_catalog, seed_products, InMemoryCatalog, NewProduct, ProductCatalog};
pub use error::{StoreError, StoreResult};
pub use feed::{
    latest_reading, FeedSubscription, InMemoryFeed, RawReading, ReadingCallback, ReadingFeed,
};
pub use session::{InMemorySessionStore, SessionCallback, SessionStore, UnavailableSessionStore};
