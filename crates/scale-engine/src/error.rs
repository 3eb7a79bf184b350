//! # Engine Error Type
//!
//! Unified error type for engine actions — what the view layer sees.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Scale POS                              │
//! │                                                                         │
//! │  View Action                 Engine                                     │
//! │  ───────────                 ──────                                     │
//! │                                                                         │
//! │  start_detection()                                                      │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  episode illegal? ─── CoreError::InvalidState ──► EngineError ──► UI   │
//! │         │                                                               │
//! │  bad cart index?  ─── CoreError::IndexOutOfRange ► EngineError ──► UI  │
//! │         │                                                               │
//! │  mirror write failed? ─ StoreError::Unavailable ─► warning notice ONLY │
//! │         │               (spawned task; NEVER an action error,           │
//! │         │                NEVER a cart rollback)                         │
//! │         ▼                                                               │
//! │  Success ─────────────────────────────────────────────────────► UI     │
//! │                                                                         │
//! │  Store errors only surface from explicit mirror READS (`session()`).   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use scale_core::CoreError;
use scale_store::StoreError;

// =============================================================================
// Engine Error
// =============================================================================

/// Errors returned by [`crate::KioskEngine`] actions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// An illegal transition or invalid cart index from the core.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The external store failed an explicit read.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Checkout was requested with nothing in the cart.
    #[error("cannot check out an empty cart")]
    EmptyCart,
}

/// Convenience type alias for Results with EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// Unit Tests
// =============================================================================
