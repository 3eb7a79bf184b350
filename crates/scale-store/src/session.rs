//! # Session Store Boundary
//!
//! Durable mirror of kiosk sessions in the external store.
//!
//! ## Asymmetric Durability
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                Cart (authoritative)  vs  Session (mirror)              │
//! │                                                                         │
//! │  confirm item ──► CartLedger.add ───────────► always applied           │
//! │        │                                                                │
//! │        └────────► SessionStore.append_item ─► best effort              │
//! │                        │                                                │
//! │                        ├── ok ──────────────► mirror caught up         │
//! │                        └── Unavailable ─────► warning, cart UNCHANGED  │
//! │                                                                         │
//! │  The kiosk must stay sellable with the persistence layer down. The     │
//! │  mirror may fall behind or diverge; it is never read back to repair    │
//! │  in-memory state.                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use scale_core::types::{CartItem, SessionRecord, SessionStatus};

use crate::error::{StoreError, StoreResult};
use crate::feed::FeedSubscription;

// =============================================================================
// Subscription Contract
// =============================================================================

/// Callback invoked with the full session record after each mirrored change.
pub type SessionCallback = Arc<dyn Fn(SessionRecord) + Send + Sync>;

// =============================================================================
// Session Store Trait
// =============================================================================

/// Durable session mirror operations.
///
/// All mutating operations are best-effort: [`StoreError::Unavailable`]
/// means the mirror fell behind, never that the caller should roll back.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Creates a new active session record, returning its id.
    async fn create(&self, started_at_ms: i64) -> StoreResult<String>;

    /// Appends a confirmed item to the mirrored session and recomputes the
    /// mirrored total by folding the item sequence.
    async fn append_item(&self, session_id: &str, item: &CartItem) -> StoreResult<()>;

    /// Marks the session completed at `ended_at_ms`.
    async fn complete(&self, session_id: &str, ended_at_ms: i64) -> StoreResult<()>;

    /// Fetches a session record, `None` when the id is unknown.
    async fn get(&self, session_id: &str) -> StoreResult<Option<SessionRecord>>;

    /// Observes mirrored changes to one session. Same guard semantics as the
    /// reading feed: idempotent unsubscribe, drop unsubscribes.
    fn subscribe(&self, session_id: &str, on_update: SessionCallback) -> FeedSubscription;
}

// =============================================================================
// In-Memory Session Store
// =============================================================================

/// In-memory [`SessionStore`] used by tests and disconnected kiosks.
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<Mutex<HashMap<String, SessionRecord>>>,
    subscribers: Arc<StdMutex<SubscriberMap>>,
}

#[derive(Default)]
struct SubscriberMap {
    by_session: HashMap<String, Vec<(u64, SessionCallback)>>,
    next_id: u64,
}

impl InMemorySessionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions currently mirrored.
    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Notifies subscribers of `session_id` with a fresh copy of the record.
    fn notify(&self, session_id: &str, record: &SessionRecord) {
        let callbacks: Vec<SessionCallback> = {
            let subscribers = self.subscribers.lock().expect("subscriber map poisoned");
            subscribers
                .by_session
                .get(session_id)
                .map(|subs| subs.iter().map(|(_, cb)| Arc::clone(cb)).collect())
                .unwrap_or_default()
        };
        for callback in callbacks {
            callback(record.clone());
        }
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, started_at_ms: i64) -> StoreResult<String> {
        let id = Uuid::new_v4().to_string();
        let record = SessionRecord::new(id.clone(), started_at_ms);
        self.sessions.lock().await.insert(id.clone(), record);
        info!(session_id = %id, started_at_ms, "session created");
        Ok(id)
    }

    async fn append_item(&self, session_id: &str, item: &CartItem) -> StoreResult<()> {
        let mut sessions = self.sessions.lock().await;
        let Some(record) = sessions.get_mut(session_id) else {
            // Unknown id: the mirror is permitted to diverge, so this is a
            // warning, not a failure the caller must handle.
            warn!(session_id = %session_id, "append to unknown session ignored");
            return Ok(());
        };
        record.items.push(item.clone());
        record.recompute_total();
        let snapshot = record.clone();
        drop(sessions);

        debug!(
            session_id = %session_id,
            item = %item.product.name,
            total = snapshot.total,
            "session item mirrored"
        );
        self.notify(session_id, &snapshot);
        Ok(())
    }

    async fn complete(&self, session_id: &str, ended_at_ms: i64) -> StoreResult<()> {
        let mut sessions = self.sessions.lock().await;
        let Some(record) = sessions.get_mut(session_id) else {
            warn!(session_id = %session_id, "complete for unknown session ignored");
            return Ok(());
        };
        record.status = SessionStatus::Completed;
        record.ended_at_ms = Some(ended_at_ms);
        let snapshot = record.clone();
        drop(sessions);

        info!(session_id = %session_id, ended_at_ms, "session completed");
        self.notify(session_id, &snapshot);
        Ok(())
    }

    async fn get(&self, session_id: &str) -> StoreResult<Option<SessionRecord>> {
        Ok(self.sessions.lock().await.get(session_id).cloned())
    }

    fn subscribe(&self, session_id: &str, on_update: SessionCallback) -> FeedSubscription {
        let id = {
            let mut subscribers = self.subscribers.lock().expect("subscriber map poisoned");
            let id = subscribers.next_id;
            subscribers.next_id += 1;
            subscribers
                .by_session
                .entry(session_id.to_string())
                .or_default()
                .push((id, on_update));
            id
        };

        let subscribers = Arc::clone(&self.subscribers);
        let session_id = session_id.to_string();
        FeedSubscription::new(move || {
            if let Ok(mut map) = subscribers.lock() {
                if let Some(subs) = map.by_session.get_mut(&session_id) {
                    subs.retain(|(sub_id, _)| *sub_id != id);
                }
            }
        })
    }
}

// =============================================================================
// Unavailable Session Store
// =============================================================================

/// A [`SessionStore`] whose backend is permanently unreachable.
///
/// Used to exercise degraded-mode behavior: every mutating call fails with
/// [`StoreError::Unavailable`] and the engine must keep the cart intact.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableSessionStore;

#[async_trait]
impl SessionStore for UnavailableSessionStore {
    async fn create(&self, _started_at_ms: i64) -> StoreResult<String> {
        Err(StoreError::unavailable("session store offline"))
    }

    async fn append_item(&self, _session_id: &str, _item: &CartItem) -> StoreResult<()> {
        Err(StoreError::unavailable("session store offline"))
    }

    async fn complete(&self, _session_id: &str, _ended_at_ms: i64) -> StoreResult<()> {
        Err(StoreError::unavailable("session store offline"))
    }

    async fn get(&self, _session_id: &str) -> StoreResult<Option<SessionRecord>> {
        Err(StoreError::unavailable("session store offline"))
    }

    fn subscribe(&self, _session_id: &str, _on_update: SessionCallback) -> FeedSubscription {
        FeedSubscription::noop()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
