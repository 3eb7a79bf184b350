//! # Reading Feed Boundary
//!
//! Abstracts the external real-time source of scale readings: a key-value
//! path in a hosted real-time store where an external producer (scale
//! firmware + vision pipeline) pushes entries.
//!
//! ## Feed Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Real-Time Reading Path                               │
//! │                                                                         │
//! │  scale/readings                                                         │
//! │  ├── -Nx81abc  →  { weight: 0.0, item: "", price: 0, timestamp: ... }  │
//! │  ├── -Nx81def  →  { weight: 1.2, item: "Banana", ... }                 │
//! │  └── -Nx81fed  →  { weight: 1.2, item: "Banana", ... }   (duplicate)  │
//! │                                                                         │
//! │  On every change the store redelivers the WHOLE snapshot. The feed     │
//! │  boundary selects the entry with the numerically largest normalized    │
//! │  timestamp and hands exactly one Reading to subscribers.               │
//! │                                                                         │
//! │  GUARANTEES (deliberately weak):                                        │
//! │  • no ordering across deliveries        • duplicates possible          │
//! │  • stale snapshots possible             • no delivery when offline     │
//! │                                                                         │
//! │  The admission rules in scale-core exist because of exactly this.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Failure Mode
//! If the external source is unavailable, `subscribe` does not error: it
//! returns a no-op subscription and the caller simply observes no readings.
//! Connectivity is surfaced separately (see [`ReadingFeed::is_connected`]),
//! never as an error through the reading pipeline.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use scale_core::types::{normalize_epoch_ms, Reading};

// =============================================================================
// Wire Record
// =============================================================================

/// Reading-shaped record as stored at the real-time path.
///
/// The producer writes timestamps as strings and cannot be fixed from here;
/// validation happens at this boundary so nothing malformed reaches the
/// reconciliation core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawReading {
    pub weight: f64,
    pub item: String,
    pub price: f64,
    pub timestamp: String,
}

impl RawReading {
    /// Validates and converts the wire record into a domain [`Reading`].
    ///
    /// Returns `None` for records whose timestamp is missing, non-numeric,
    /// or non-positive; those entries are dropped at the boundary.
    pub fn into_reading(self) -> Option<Reading> {
        let captured_at_ms = self.timestamp.trim().parse::<i64>().ok()?;
        if captured_at_ms <= 0 {
            return None;
        }
        Some(Reading {
            weight: self.weight,
            item_label: self.item,
            unit_price: self.price,
            captured_at_ms,
        })
    }
}

/// Selects the freshest valid reading among all concurrently present
/// entries: the one with the numerically largest normalized timestamp.
///
/// Invalid entries (unparseable or non-positive timestamps) are skipped
/// entirely rather than sorted by key.
pub fn latest_reading(entries: &HashMap<String, RawReading>) -> Option<Reading> {
    entries
        .values()
        .cloned()
        .filter_map(RawReading::into_reading)
        .max_by_key(|reading| normalize_epoch_ms(reading.captured_at_ms))
}

// =============================================================================
// Subscription Contract
// =============================================================================

/// Callback invoked for each delivered reading.
pub type ReadingCallback = Arc<dyn Fn(Reading) + Send + Sync>;

/// Guard for an active feed subscription.
///
/// `unsubscribe` is idempotent and safe to call any number of times;
/// dropping the guard unsubscribes too. Consumers MUST drop or unsubscribe
/// when their context is torn down, otherwise a leaked callback keeps
/// mutating a dead session.
pub struct FeedSubscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
    live: bool,
}

impl FeedSubscription {
    /// Creates a live subscription guard around a cancel action.
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        FeedSubscription {
            cancel: Some(Box::new(cancel)),
            live: true,
        }
    }

    /// A subscription that was never established (disconnected source).
    pub fn noop() -> Self {
        FeedSubscription {
            cancel: None,
            live: false,
        }
    }

    /// Whether deliveries can still arrive through this subscription.
    pub fn is_live(&self) -> bool {
        self.live && self.cancel.is_some()
    }

    /// Stops further delivery. Idempotent.
    pub fn unsubscribe(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
        self.live = false;
    }
}

impl Drop for FeedSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for FeedSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedSubscription")
            .field("live", &self.is_live())
            .finish()
    }
}

// =============================================================================
// Feed Trait
// =============================================================================

/// Push-based subscription to the external reading source.
///
/// The path is read-only from the application's perspective: the engine
/// consumes readings and never writes scale commands.
pub trait ReadingFeed: Send + Sync {
    /// Registers `on_reading` for asynchronous delivery.
    ///
    /// Zero or more invocations, in whatever order the external source
    /// delivers, duplicates included. Never errors: an unavailable source
    /// yields a no-op subscription ([`FeedSubscription::noop`]).
    fn subscribe(&self, on_reading: ReadingCallback) -> FeedSubscription;

    /// Pull-style read of the freshest entry currently present, if any.
    fn latest(&self) -> Option<Reading>;

    /// Whether the external source is reachable. Surfaced to the UI as a
    /// connectivity badge, not through the reading pipeline.
    fn is_connected(&self) -> bool;
}

// =============================================================================
// In-Memory Feed
// =============================================================================

/// In-memory [`ReadingFeed`] with the same weak delivery guarantees as the
/// hosted store: every published entry triggers a full-snapshot selection,
/// so subscribers can see the same reading twice and can see stale data.
///
/// Used by tests and by kiosks running without a backend.
#[derive(Clone)]
pub struct InMemoryFeed {
    inner: Arc<FeedInner>,
}

struct FeedInner {
    connected: bool,
    state: Mutex<FeedState>,
}

#[derive(Default)]
struct FeedState {
    entries: HashMap<String, RawReading>,
    subscribers: HashMap<u64, ReadingCallback>,
    next_subscriber_id: u64,
}

impl InMemoryFeed {
    /// Creates a connected feed with no entries.
    pub fn new() -> Self {
        InMemoryFeed {
            inner: Arc::new(FeedInner {
                connected: true,
                state: Mutex::new(FeedState::default()),
            }),
        }
    }

    /// Creates a feed that behaves like an unreachable source: subscriptions
    /// are no-ops and `latest` sees nothing.
    pub fn offline() -> Self {
        InMemoryFeed {
            inner: Arc::new(FeedInner {
                connected: false,
                state: Mutex::new(FeedState::default()),
            }),
        }
    }

    /// Publishes an entry at `key` and redelivers the snapshot's freshest
    /// reading to every subscriber, exactly like the hosted store does.
    pub fn publish(&self, key: &str, raw: RawReading) {
        if !self.inner.connected {
            return;
        }

        let (reading, callbacks) = {
            let mut state = self.inner.state.lock().expect("feed state poisoned");
            state.entries.insert(key.to_string(), raw);
            let reading = latest_reading(&state.entries);
            let callbacks: Vec<ReadingCallback> = state.subscribers.values().cloned().collect();
            (reading, callbacks)
        };

        // Deliver outside the lock: a callback may unsubscribe re-entrantly.
        if let Some(reading) = reading {
            debug!(
                item = %reading.item_label,
                weight = reading.weight,
                captured_at_ms = reading.captured_at_ms,
                subscribers = callbacks.len(),
                "delivering reading"
            );
            for callback in callbacks {
                callback(reading.clone());
            }
        }
    }

    /// Drops all entries, as when the producer resets its path.
    pub fn clear_entries(&self) {
        if let Ok(mut state) = self.inner.state.lock() {
            state.entries.clear();
        }
    }
}

impl Default for InMemoryFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadingFeed for InMemoryFeed {
    fn subscribe(&self, on_reading: ReadingCallback) -> FeedSubscription {
        if !self.inner.connected {
            warn!("reading source unavailable, returning no-op subscription");
            return FeedSubscription::noop();
        }

        let id = {
            let mut state = self.inner.state.lock().expect("feed state poisoned");
            let id = state.next_subscriber_id;
            state.next_subscriber_id += 1;
            state.subscribers.insert(id, on_reading);
            id
        };

        let inner = Arc::clone(&self.inner);
        FeedSubscription::new(move || {
            if let Ok(mut state) = inner.state.lock() {
                state.subscribers.remove(&id);
            }
        })
    }

    fn latest(&self) -> Option<Reading> {
        if !self.inner.connected {
            return None;
        }
        let state = self.inner.state.lock().expect("feed state poisoned");
        latest_reading(&state.entries)
    }

    fn is_connected(&self) -> bool {
        self.inner.connected
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn raw(weight: f64, item: &str, timestamp: &str) -> RawReading {
        RawReading {
            weight,
            item: item.to_string(),
            price: 2.49,
            timestamp: timestamp.to_string(),
        }
    }

    #[test]
    fn test_raw_reading_validation() {
        assert!(raw(1.0, "Banana", "1700000000000").into_reading().is_some());
        assert!(raw(1.0, "Banana", "0").into_reading().is_none());
        assert!(raw(1.0, "Banana", "-3").into_reading().is_none());
        assert!(raw(1.0, "Banana", "not-a-number").into_reading().is_none());
        assert!(raw(1.0, "Banana", "").into_reading().is_none());
    }

    #[test]
    fn test_latest_reading_prefers_largest_normalized_timestamp() {
        let mut entries = HashMap::new();
        // Seconds-shaped entry that is actually the freshest once normalized.
        entries.insert("a".to_string(), raw(1.0, "Old", "1700000000000"));
        entries.insert("b".to_string(), raw(2.0, "New", "1700000001"));

        let latest = latest_reading(&entries).unwrap();
        assert_eq!(latest.item_label, "New");
    }

    #[test]
    fn test_latest_reading_skips_invalid_entries() {
        let mut entries = HashMap::new();
        entries.insert("bad".to_string(), raw(9.0, "Ghost", "garbage"));
        entries.insert("ok".to_string(), raw(1.0, "Banana", "1700000000000"));

        let latest = latest_reading(&entries).unwrap();
        assert_eq!(latest.item_label, "Banana");

        let only_bad: HashMap<_, _> =
            [("bad".to_string(), raw(9.0, "Ghost", "garbage"))].into();
        assert!(latest_reading(&only_bad).is_none());
    }

    #[test]
    fn test_publish_delivers_to_subscribers() {
        let feed = InMemoryFeed::new();
        let seen = Arc::new(AtomicUsize::new(0));

        let seen_cb = Arc::clone(&seen);
        let _sub = feed.subscribe(Arc::new(move |reading| {
            assert_eq!(reading.item_label, "Banana");
            seen_cb.fetch_add(1, Ordering::SeqCst);
        }));

        feed.publish("k1", raw(1.0, "Banana", "1700000000000"));
        // A second publish of an OLDER entry redelivers the same snapshot
        // winner: duplicates are part of the contract.
        feed.publish("k0", raw(0.5, "Stale", "1600000000000"));

        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unsubscribe_stops_delivery_and_is_idempotent() {
        let feed = InMemoryFeed::new();
        let seen = Arc::new(AtomicUsize::new(0));

        let seen_cb = Arc::clone(&seen);
        let mut sub = feed.subscribe(Arc::new(move |_| {
            seen_cb.fetch_add(1, Ordering::SeqCst);
        }));
        assert!(sub.is_live());

        feed.publish("k1", raw(1.0, "Banana", "1700000000000"));
        sub.unsubscribe();
        sub.unsubscribe();
        assert!(!sub.is_live());

        feed.publish("k2", raw(1.0, "Banana", "1700000002000"));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let feed = InMemoryFeed::new();
        let seen = Arc::new(AtomicUsize::new(0));

        {
            let seen_cb = Arc::clone(&seen);
            let _sub = feed.subscribe(Arc::new(move |_| {
                seen_cb.fetch_add(1, Ordering::SeqCst);
            }));
        }

        feed.publish("k1", raw(1.0, "Banana", "1700000000000"));
        assert_eq!(seen.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_offline_feed_degrades_silently() {
        let feed = InMemoryFeed::offline();
        assert!(!feed.is_connected());

        let sub = feed.subscribe(Arc::new(|_| panic!("must never deliver")));
        assert!(!sub.is_live());

        feed.publish("k1", raw(1.0, "Banana", "1700000000000"));
        assert!(feed.latest().is_none());
    }

    #[test]
    fn test_latest_pull_matches_push_selection() {
        let feed = InMemoryFeed::new();
        feed.publish("k1", raw(1.0, "Banana", "1700000000000"));
        feed.publish("k2", raw(2.0, "Orange", "1700000005000"));

        let latest = feed.latest().unwrap();
        assert_eq!(latest.item_label, "Orange");
    }
}
