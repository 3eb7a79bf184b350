//! # Detection Episode State Machine
//!
//! Owns one detection episode at a time and nothing else. The engine feeds
//! it events (readings, timer expiry, clerk actions); it answers with
//! deterministic transitions.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  Detection Episode Lifecycle                            │
//! │                                                                         │
//! │                 start(now)                                              │
//! │   ┌────────┐ ─────────────► ┌────────┐                                 │
//! │   │  Idle  │                │ Active │◄── StaleDiscard /               │
//! │   └────────┘ ◄───────────┐  └───┬────┘    SentinelDiscard /            │
//! │        ▲                 │      │         ZeroWeightPending (no-op)    │
//! │        │                 │      │                                       │
//! │        │ acknowledge()   │      ├── Admissible ────► ┌──────────┐      │
//! │        │                 │      │                    │ Resolved │      │
//! │        │                 │      ├── timer elapsed ─► ┌──────────┐      │
//! │        │                 │      │                    │ TimedOut │      │
//! │        │                 │      └── cancel() ──────► ┌───────────┐     │
//! │        │                 │           (also legal     │ Cancelled │     │
//! │        └─────────────────┴────────── from Resolved)  └───────────┘     │
//! │                                                                         │
//! │  INVARIANT: exactly one started_at_ms is authoritative at a time.      │
//! │  The admission timestamp floor is only sound because of this.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Clock Discipline
//! The machine never reads a clock. `start` takes `now_ms` from the caller
//! and timer expiry arrives as a [`DetectionEpisode::time_out`] event, so
//! every transition is replayable in tests.

use serde::Serialize;

use crate::error::{CoreError, CoreResult};
use crate::filter::{admit, Admission};
use crate::types::{Product, Reading};

// =============================================================================
// Episode Status
// =============================================================================

/// Status of the detection state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EpisodeStatus {
    /// No episode in flight; readings fall through as stale.
    Idle,
    /// Episode armed and consuming readings.
    Active,
    /// An admissible reading fixed a product + weight; waiting for the
    /// clerk to confirm, correct, or rescan.
    Resolved,
    /// The timeout elapsed with no admissible reading.
    TimedOut,
    /// The clerk stopped the episode.
    Cancelled,
}

impl EpisodeStatus {
    /// Whether the episode has reached a terminal state awaiting
    /// acknowledgement.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EpisodeStatus::Resolved | EpisodeStatus::TimedOut | EpisodeStatus::Cancelled
        )
    }
}

// =============================================================================
// Resolved Item
// =============================================================================

/// The `(product, weight)` pair an episode resolved to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedItem {
    pub product: Product,
    pub weight: f64,
}

// =============================================================================
// Detection Episode
// =============================================================================

/// Single-episode detection state machine.
///
/// One at a time: starting again replaces the previous (acknowledged)
/// episode, which is what keeps an old episode's late readings from racing a
/// new episode's fresh ones.
#[derive(Debug, Clone)]
pub struct DetectionEpisode {
    status: EpisodeStatus,
    started_at_ms: Option<i64>,
    resolved: Option<ResolvedItem>,
}

impl DetectionEpisode {
    /// Creates the machine in `Idle`.
    pub fn new() -> Self {
        DetectionEpisode {
            status: EpisodeStatus::Idle,
            started_at_ms: None,
            resolved: None,
        }
    }

    /// Current status.
    #[inline]
    pub fn status(&self) -> EpisodeStatus {
        self.status
    }

    /// Start time of the episode in flight, if any.
    #[inline]
    pub fn started_at_ms(&self) -> Option<i64> {
        self.started_at_ms
    }

    /// The resolved `(product, weight)` pair, present only in `Resolved`.
    pub fn resolved(&self) -> Option<&ResolvedItem> {
        self.resolved.as_ref()
    }

    /// Starts a new episode at `now_ms`.
    ///
    /// Fails with [`CoreError::InvalidState`] while an episode is Active.
    /// Starting from a terminal state acknowledges it implicitly: a new
    /// start is one of the documented acknowledgement paths.
    pub fn start(&mut self, now_ms: i64) -> CoreResult<()> {
        if self.status == EpisodeStatus::Active {
            return Err(CoreError::InvalidState {
                action: "start",
                state: self.status,
            });
        }
        self.status = EpisodeStatus::Active;
        self.started_at_ms = Some(now_ms);
        self.resolved = None;
        Ok(())
    }

    /// Feeds one reading through the admission rules.
    ///
    /// Only an Active episode consumes readings; in any other state the
    /// reading is reported stale (nothing is listening), which is also what
    /// makes a duplicated delivery of the resolving reading a no-op.
    pub fn observe(&mut self, reading: &Reading, catalog: &[Product]) -> Admission {
        let started_at_ms = if self.status == EpisodeStatus::Active {
            self.started_at_ms
        } else {
            None
        };

        let admission = admit(reading, started_at_ms, catalog);

        if let Admission::Admissible { product, weight } = &admission {
            self.status = EpisodeStatus::Resolved;
            self.resolved = Some(ResolvedItem {
                product: product.clone(),
                weight: *weight,
            });
        }

        admission
    }

    /// Timer expiry event. Transitions Active → TimedOut and returns `true`;
    /// in every other state the late timer is an ignorable no-op (`false`).
    pub fn time_out(&mut self) -> bool {
        if self.status != EpisodeStatus::Active {
            return false;
        }
        self.status = EpisodeStatus::TimedOut;
        true
    }

    /// Clerk stop. Active or Resolved → Cancelled; always legal, idempotent.
    /// Returns whether a transition happened.
    pub fn cancel(&mut self) -> bool {
        match self.status {
            EpisodeStatus::Active | EpisodeStatus::Resolved => {
                self.status = EpisodeStatus::Cancelled;
                self.resolved = None;
                true
            }
            _ => false,
        }
    }

    /// Acknowledges a finished episode, returning the machine to Idle and
    /// clearing the stored product/weight.
    ///
    /// Fails with [`CoreError::InvalidState`] while Active: a live episode
    /// must resolve, time out, or be cancelled first.
    pub fn acknowledge(&mut self) -> CoreResult<()> {
        if self.status == EpisodeStatus::Active {
            return Err(CoreError::InvalidState {
                action: "acknowledge",
                state: self.status,
            });
        }
        self.status = EpisodeStatus::Idle;
        self.started_at_ms = None;
        self.resolved = None;
        Ok(())
    }
}

impl Default for DetectionEpisode {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const START_MS: i64 = 1_700_000_000_000;

    fn settled(label: &str, weight: f64, captured_at_ms: i64) -> Reading {
        Reading {
            weight,
            item_label: label.to_string(),
            unit_price: 3.99,
            captured_at_ms,
        }
    }

    #[test]
    fn test_starts_idle_and_ignores_readings() {
        let mut episode = DetectionEpisode::new();
        assert_eq!(episode.status(), EpisodeStatus::Idle);

        let verdict = episode.observe(&settled("Banana", 1.0, START_MS + 1), &[]);
        assert_eq!(verdict, Admission::StaleDiscard);
        assert_eq!(episode.status(), EpisodeStatus::Idle);
    }

    #[test]
    fn test_start_while_active_is_invalid() {
        let mut episode = DetectionEpisode::new();
        episode.start(START_MS).unwrap();
        assert_eq!(
            episode.start(START_MS + 1),
            Err(CoreError::InvalidState {
                action: "start",
                state: EpisodeStatus::Active,
            })
        );
    }

    #[test]
    fn test_admissible_reading_resolves_once() {
        let mut episode = DetectionEpisode::new();
        episode.start(START_MS).unwrap();

        let reading = settled("Banana", 1.0, START_MS + 1);
        assert!(matches!(
            episode.observe(&reading, &[]),
            Admission::Admissible { .. }
        ));
        assert_eq!(episode.status(), EpisodeStatus::Resolved);
        let resolved = episode.resolved().expect("resolved item");
        assert_eq!(resolved.product.name, "Banana");
        assert_eq!(resolved.weight, 1.0);

        // Duplicated delivery: the episode is no longer Active, so the same
        // reading is reported stale and the resolution is untouched.
        assert_eq!(episode.observe(&reading, &[]), Admission::StaleDiscard);
        assert_eq!(episode.status(), EpisodeStatus::Resolved);
    }

    #[test]
    fn test_discards_keep_episode_active() {
        let mut episode = DetectionEpisode::new();
        episode.start(START_MS).unwrap();

        episode.observe(&settled("Banana", 1.0, START_MS - 5), &[]);
        episode.observe(&settled("", 1.0, START_MS + 1), &[]);
        episode.observe(&settled("Banana", 0.0, START_MS + 1), &[]);

        assert_eq!(episode.status(), EpisodeStatus::Active);
        assert!(episode.resolved().is_none());
    }

    #[test]
    fn test_timeout_only_fires_while_active() {
        let mut episode = DetectionEpisode::new();
        episode.start(START_MS).unwrap();
        assert!(episode.time_out());
        assert_eq!(episode.status(), EpisodeStatus::TimedOut);

        // A second (late) timer is a no-op.
        assert!(!episode.time_out());
        assert_eq!(episode.status(), EpisodeStatus::TimedOut);
    }

    #[test]
    fn test_late_timeout_does_not_clobber_resolution() {
        let mut episode = DetectionEpisode::new();
        episode.start(START_MS).unwrap();
        episode.observe(&settled("Banana", 1.0, START_MS + 1), &[]);
        assert_eq!(episode.status(), EpisodeStatus::Resolved);

        assert!(!episode.time_out());
        assert_eq!(episode.status(), EpisodeStatus::Resolved);
    }

    #[test]
    fn test_cancel_from_active_and_resolved() {
        let mut episode = DetectionEpisode::new();
        episode.start(START_MS).unwrap();
        assert!(episode.cancel());
        assert_eq!(episode.status(), EpisodeStatus::Cancelled);
        // Idempotent.
        assert!(!episode.cancel());

        episode.acknowledge().unwrap();
        episode.start(START_MS + 10).unwrap();
        episode.observe(&settled("Banana", 1.0, START_MS + 11), &[]);
        assert!(episode.cancel());
        assert!(episode.resolved().is_none());
    }

    #[test]
    fn test_acknowledge_clears_and_permits_restart() {
        let mut episode = DetectionEpisode::new();
        episode.start(START_MS).unwrap();
        episode.observe(&settled("Banana", 1.0, START_MS + 1), &[]);

        episode.acknowledge().unwrap();
        assert_eq!(episode.status(), EpisodeStatus::Idle);
        assert!(episode.resolved().is_none());
        assert!(episode.started_at_ms().is_none());

        episode.start(START_MS + 100).unwrap();
        assert_eq!(episode.started_at_ms(), Some(START_MS + 100));
    }

    #[test]
    fn test_acknowledge_while_active_is_invalid() {
        let mut episode = DetectionEpisode::new();
        episode.start(START_MS).unwrap();
        assert!(matches!(
            episode.acknowledge(),
            Err(CoreError::InvalidState { action: "acknowledge", .. })
        ));
    }

    #[test]
    fn test_restart_after_timeout_succeeds() {
        let mut episode = DetectionEpisode::new();
        episode.start(START_MS).unwrap();
        episode.time_out();

        // A new start acknowledges the timed-out episode implicitly.
        episode.start(START_MS + 50).unwrap();
        assert_eq!(episode.status(), EpisodeStatus::Active);
        assert_eq!(episode.started_at_ms(), Some(START_MS + 50));
    }
}
