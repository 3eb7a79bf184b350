//! # scale-engine: Event-Driven Kiosk Engine for Scale POS
//!
//! Wires the pure reconciliation core ([`scale_core`]) to the external
//! boundaries ([`scale_store`]) and exposes the action set a kiosk screen
//! calls. The view layer is a thin renderer over the snapshots and events
//! this crate produces; no reconciliation logic lives outside it.
//!
//! ## Data Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ReadingFeed ──► admission rules ──► DetectionEpisode ──► (clerk        │
//! │   (push sub)       (scale-core)        (scale-core)       confirms)     │
//! │                                                              │          │
//! │                                            ┌─────────────────┤          │
//! │                                            ▼                 ▼          │
//! │                                       CartLedger        SessionStore    │
//! │                                     (authoritative)    (best-effort     │
//! │                                            │              mirror)       │
//! │                                            ▼                            │
//! │                                       checkout() ──► CheckoutReceipt   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//! ```rust,no_run
//! use std::sync::Arc;
//! use scale_engine::{EngineConfig, KioskEngine, NoOpEmitter};
//! use scale_store::{InMemoryCatalog, InMemoryFeed, InMemorySessionStore};
//!
//! # async fn run() {
//! let engine = KioskEngine::connect(
//!     Arc::new(InMemoryFeed::new()),
//!     Arc::new(InMemorySessionStore::new()),
//!     Arc::new(InMemoryCatalog::seeded().await),
//!     Arc::new(NoOpEmitter),
//!     EngineConfig::default(),
//! )
//! .await;
//!
//! engine.start_detection().expect("idle kiosk can start");
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod emitter;
pub mod engine;
pub mod error;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use config::EngineConfig;
pub use emitter::{KioskEventEmitter, NoOpEmitter, Notice, NoticeKind};
pub use engine::{CartSnapshot, CheckoutReceipt, DetectionSnapshot, KioskEngine};
pub use error::{EngineError, EngineResult};
