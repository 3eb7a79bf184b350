//! # Error Types
//!
//! Domain-specific error types for scale-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  scale-core errors (this file)                                         │
//! │  └── CoreError        - Illegal transitions, bad cart indices          │
//! │                                                                         │
//! │  scale-store errors (separate crate)                                   │
//! │  └── StoreError       - External store unavailable                     │
//! │                                                                         │
//! │  scale-engine errors (in engine crate)                                 │
//! │  └── EngineError      - What the view layer sees                       │
//! │                                                                         │
//! │  NOT an error: a detection timeout. It is a first-class episode        │
//! │  outcome (EpisodeStatus::TimedOut) surfaced as a recoverable notice.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (action, state, index)
//! 3. Errors are enum variants, never String
//! 4. No error leaves the cart or episode half-updated: an operation either
//!    fully applies its transition or fully declines it

use thiserror::Error;

use crate::detection::EpisodeStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Reconciliation-logic errors.
///
/// These represent caller mistakes (illegal transition requests, invalid
/// indices) and are surfaced, never silently ignored.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// An operation was requested in a state that does not allow it.
    ///
    /// ## When This Occurs
    /// - `start()` while an episode is already Active
    /// - `acknowledge()` while the episode is still Active
    /// - `checkout()` on an empty cart
    #[error("cannot {action} while episode is {state:?}")]
    InvalidState {
        action: &'static str,
        state: EpisodeStatus,
    },

    /// A cart removal named a position that does not exist.
    ///
    /// ## When This Occurs
    /// Only on a caller bug: the view layer should offer removal solely for
    /// indices it just rendered.
    #[error("cart index {index} out of range (cart has {len} items)")]
    IndexOutOfRange { index: usize, len: usize },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
