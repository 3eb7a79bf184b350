//! # Kiosk Event Emitter
//!
//! The engine's outbound channel to the view layer. The UI never polls; it
//! receives a fresh snapshot whenever detection or cart state changes, plus
//! user-facing notices at the moments a clerk expects feedback.
//!
//! ## Event Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  View layer                                                             │
//! │  ──────────                                                             │
//! │                                                                         │
//! │  on detection_changed  → re-render detection panel                     │
//! │  on cart_changed       → re-render cart + totals                       │
//! │  on connectivity       → connected/disconnected badge                  │
//! │  on notice             → toast (info / success / warning)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Implementations must be cheap and non-blocking: emits happen on the
//! engine's event path. They must also not call back into the engine.

use serde::Serialize;

use crate::engine::{CartSnapshot, DetectionSnapshot};

// =============================================================================
// Notices
// =============================================================================

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Info,
    Success,
    Warning,
}

/// A short, user-facing message (rendered as a toast by the view layer).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Notice {
            kind: NoticeKind::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Notice {
            kind: NoticeKind::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Notice {
            kind: NoticeKind::Warning,
            message: message.into(),
        }
    }
}

// =============================================================================
// Emitter Trait
// =============================================================================

/// Trait for delivering engine events to the view layer.
pub trait KioskEventEmitter: Send + Sync {
    /// Detection panel state changed (episode status, product, weight).
    fn detection_changed(&self, snapshot: &DetectionSnapshot);

    /// Cart contents or totals changed.
    fn cart_changed(&self, snapshot: &CartSnapshot);

    /// Feed connectivity changed (degraded/disconnected badge).
    fn connectivity_changed(&self, connected: bool);

    /// A user-facing notice should be shown.
    fn notice(&self, notice: &Notice);
}

/// No-op event emitter for tests and headless use.
pub struct NoOpEmitter;

impl KioskEventEmitter for NoOpEmitter {
    fn detection_changed(&self, _snapshot: &DetectionSnapshot) {}
    fn cart_changed(&self, _snapshot: &CartSnapshot) {}
    fn connectivity_changed(&self, _connected: bool) {}
    fn notice(&self, _notice: &Notice) {}
}
