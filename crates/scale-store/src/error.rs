//! # Store Error Types
//!
//! Errors surfaced by the external-collaborator boundaries.
//!
//! ## Design Principles
//! 1. One failure mode matters to callers: the external store is not
//!    reachable right now. Everything else is folded into its reason string.
//! 2. Store errors NEVER roll back in-memory state. The cart and episode are
//!    authoritative; the mirror is allowed to fall behind.

use thiserror::Error;

// =============================================================================
// Store Error
// =============================================================================

/// External-store failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// The external store could not serve the operation.
    ///
    /// ## When This Occurs
    /// - The kiosk is offline
    /// - The store rejected or timed out the write
    ///
    /// ## Caller Contract
    /// Log it, surface a warning, keep going. The in-memory cart stays as-is.
    #[error("external store unavailable: {reason}")]
    Unavailable { reason: String },
}

impl StoreError {
    /// Convenience constructor for the common case.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        StoreError::Unavailable {
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with StoreError.
pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message() {
        let err = StoreError::unavailable("connection refused");
        assert_eq!(
            err.to_string(),
            "external store unavailable: connection refused"
        );
    }
}
