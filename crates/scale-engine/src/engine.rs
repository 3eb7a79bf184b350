//! # Kiosk Engine
//!
//! The event-driven reconciliation engine: bridges the reading feed to the
//! detection state machine, the cart ledger, and the durable session mirror,
//! and exposes the action set the view layer calls.
//!
//! ## Event Sources and Serialization
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     KioskEngine Event Model                             │
//! │                                                                         │
//! │  Feed delivery ──┐                                                      │
//! │  Timer expiry ───┼──► ONE state mutex ──► episode / cart / mirror-id   │
//! │  Clerk actions ──┘        (serialized)                                  │
//! │                                                                         │
//! │  Each event handler runs to completion under the lock before the next  │
//! │  is processed, preserving the one-episode-at-a-time and append-only    │
//! │  ledger invariants on a multi-threaded runtime.                        │
//! │                                                                         │
//! │  SIDE EFFECTS leave the lock first:                                    │
//! │  • event emits happen after the guard is dropped                       │
//! │  • store writes are spawned tasks (best-effort, never block actions,   │
//! │    never roll back the cart)                                           │
//! │  • the timeout timer is disarmed on every terminal transition; a late  │
//! │    timer that fires anyway is rejected by an episode-start epoch check │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use scale_core::{
    Admission, CartItem, CartLedger, CartTotals, CoreError, DetectionEpisode, EpisodeStatus,
    Product, Reading, SessionRecord,
};
use scale_store::{FeedSubscription, ProductCatalog, ReadingFeed, SessionStore};

use crate::config::EngineConfig;
use crate::emitter::{KioskEventEmitter, Notice};
use crate::error::{EngineError, EngineResult};

// =============================================================================
// UI-Facing Snapshots
// =============================================================================

/// What the detection panel renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionSnapshot {
    /// Episode status (idle / active / resolved / timedout / cancelled).
    pub status: EpisodeStatus,

    /// Start of the episode in flight, if any (epoch ms).
    pub started_at_ms: Option<i64>,

    /// Resolved product, present only when status is Resolved.
    pub product: Option<Product>,

    /// Resolved weight in kilograms, present only when status is Resolved.
    pub weight: Option<f64>,
}

/// What the cart panel renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSnapshot {
    /// Lines in confirmation order.
    pub items: Vec<CartItem>,

    /// Folded totals.
    pub totals: CartTotals,
}

/// Everything the (out-of-scope) print layer needs to render a receipt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutReceipt {
    /// The completed session's id, when a mirror session existed.
    pub session_id: Option<String>,

    /// Committed lines in confirmation order (= receipt order).
    pub items: Vec<CartItem>,

    /// Folded totals at commit time.
    pub totals: CartTotals,

    /// When checkout committed (epoch ms).
    pub completed_at_ms: i64,
}

// =============================================================================
// Engine State
// =============================================================================

/// Everything mutated by event handlers, behind the single mutex.
struct EngineState {
    episode: DetectionEpisode,
    cart: CartLedger,

    /// Catalog snapshot loaded at connect time; used for label lookup on the
    /// reading hot path.
    catalog: Vec<Product>,

    /// Durable session id, once the spawned create has landed. One session
    /// spans start-detection → checkout.
    session_id: Option<String>,

    /// Guards against spawning a second create while one is in flight.
    session_create_in_flight: bool,

    /// Feed connectivity at connect time.
    connected: bool,
}

struct EngineInner {
    config: EngineConfig,
    feed: Arc<dyn ReadingFeed>,
    store: Arc<dyn SessionStore>,
    emitter: Arc<dyn KioskEventEmitter>,
    state: Mutex<EngineState>,

    /// The armed detection timeout, if any. Replaced on re-arm, aborted on
    /// disarm and on engine drop.
    timeout_task: Mutex<Option<JoinHandle<()>>>,

    /// Live feed subscription; dropped (= unsubscribed) on shutdown so a
    /// leaked callback cannot mutate a dead engine.
    feed_subscription: Mutex<Option<FeedSubscription>>,
}

impl Drop for EngineInner {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.timeout_task.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }
}

fn detection_snapshot(state: &EngineState) -> DetectionSnapshot {
    let resolved = state.episode.resolved();
    DetectionSnapshot {
        status: state.episode.status(),
        started_at_ms: state.episode.started_at_ms(),
        product: resolved.map(|r| r.product.clone()),
        weight: resolved.map(|r| r.weight),
    }
}

fn cart_snapshot(state: &EngineState) -> CartSnapshot {
    CartSnapshot {
        items: state.cart.items().to_vec(),
        totals: state.cart.totals(),
    }
}

// =============================================================================
// Kiosk Engine
// =============================================================================

/// The reconciliation engine behind one kiosk screen.
///
/// Cheap to clone (shared handle). All actions are synchronous: they apply
/// their in-memory transition fully (or decline it fully), then trigger any
/// durable side effects as spawned best-effort writes.
///
/// Must be used within a Tokio runtime: the detection timeout and the mirror
/// writes are spawned tasks.
#[derive(Clone)]
pub struct KioskEngine {
    inner: Arc<EngineInner>,
}

impl KioskEngine {
    /// Wires the engine to its collaborators and subscribes to the feed.
    ///
    /// Loads a catalog snapshot (best-effort: an unreachable catalog yields
    /// an empty snapshot and every label synthesizes) and surfaces feed
    /// connectivity through the emitter — a dead feed is a degraded kiosk,
    /// not an error.
    pub async fn connect(
        feed: Arc<dyn ReadingFeed>,
        store: Arc<dyn SessionStore>,
        catalog: Arc<dyn ProductCatalog>,
        emitter: Arc<dyn KioskEventEmitter>,
        config: EngineConfig,
    ) -> Self {
        let products = catalog.get_products().await;
        info!(products = products.len(), "catalog snapshot loaded");

        let connected = feed.is_connected();
        let inner = Arc::new(EngineInner {
            config,
            feed: Arc::clone(&feed),
            store,
            emitter,
            state: Mutex::new(EngineState {
                episode: DetectionEpisode::new(),
                cart: CartLedger::new(),
                catalog: products,
                session_id: None,
                session_create_in_flight: false,
                connected,
            }),
            timeout_task: Mutex::new(None),
            feed_subscription: Mutex::new(None),
        });

        // The callback holds a Weak handle: the feed must not keep a dead
        // engine alive, and unsubscription must actually tear down.
        let weak = Arc::downgrade(&inner);
        let subscription = feed.subscribe(Arc::new(move |reading| {
            if let Some(inner) = weak.upgrade() {
                KioskEngine { inner }.handle_reading(reading);
            }
        }));

        if !connected {
            warn!("reading feed unavailable; kiosk running degraded");
        }
        inner.emitter.connectivity_changed(connected);
        *inner
            .feed_subscription
            .lock()
            .expect("subscription slot poisoned") = Some(subscription);

        KioskEngine { inner }
    }

    // -------------------------------------------------------------------------
    // Actions (UI boundary)
    // -------------------------------------------------------------------------

    /// Starts a detection episode.
    ///
    /// Fails with `InvalidState` while an episode is already Active. Creates
    /// a durable session when none is open for this cart cycle, and arms the
    /// detection timeout.
    pub fn start_detection(&self) -> EngineResult<DetectionSnapshot> {
        let snapshot = self.begin_episode()?;
        debug!(started_at_ms = ?snapshot.started_at_ms, "detection started");
        self.inner
            .emitter
            .notice(&Notice::info("Scale activated - place the item on the scale"));
        Ok(snapshot)
    }

    /// Acknowledges a finished episode and immediately starts the next one,
    /// keeping the current session. Offered to the clerk from the
    /// confirmation dialog ("scan again").
    pub fn rescan(&self) -> EngineResult<DetectionSnapshot> {
        self.with_state(|state| {
            if state.episode.status() == EpisodeStatus::Active {
                return Err(CoreError::InvalidState {
                    action: "rescan",
                    state: EpisodeStatus::Active,
                });
            }
            state.episode.acknowledge()
        })?;

        let snapshot = self.begin_episode()?;
        debug!("rescan started");
        self.inner.emitter.notice(&Notice::info("Ready for the next item"));
        Ok(snapshot)
    }

    /// Confirms the resolved item into the cart.
    ///
    /// `product_override` supports manual correction when the detector got
    /// the item wrong; `weight_override` supports keyed-in weights. Both
    /// default to the episode's resolution. Fails with `InvalidState` unless
    /// the episode is Resolved.
    ///
    /// The durable mirror append is spawned best-effort: if the store is
    /// down, the cart keeps the item and a warning notice is shown.
    pub fn confirm_current(
        &self,
        product_override: Option<Product>,
        weight_override: Option<f64>,
    ) -> EngineResult<CartSnapshot> {
        let now_ms = Utc::now().timestamp_millis();

        let (item, cart, detection, session_id) = self.with_state(move |state| {
            let resolved = match state.episode.resolved() {
                Some(resolved) => resolved.clone(),
                None => {
                    return Err(EngineError::Core(CoreError::InvalidState {
                        action: "confirm",
                        state: state.episode.status(),
                    }))
                }
            };

            let product = product_override.unwrap_or(resolved.product);
            let weight = weight_override.unwrap_or(resolved.weight);

            let item = state.cart.add(product, weight, now_ms).clone();
            state.episode.acknowledge()?;

            Ok((
                item,
                cart_snapshot(state),
                detection_snapshot(state),
                state.session_id.clone(),
            ))
        })?;

        self.disarm_timeout();

        info!(
            item = %item.product.name,
            weight = item.weight,
            total = item.total_price,
            "item confirmed into cart"
        );

        match session_id {
            Some(session_id) => self.spawn_session_append(session_id, item.clone()),
            None => debug!("no session mirror yet; confirmation not mirrored"),
        }

        self.inner.emitter.cart_changed(&cart);
        self.inner.emitter.detection_changed(&detection);
        self.inner
            .emitter
            .notice(&Notice::success(format!("Added {} to cart", item.product.name)));
        Ok(cart)
    }

    /// Stops detection: cancels any live or resolved episode and returns the
    /// machine to Idle. Always legal, idempotent.
    pub fn stop_detection(&self) -> EngineResult<DetectionSnapshot> {
        let snapshot = self.with_state(|state| {
            let cancelled = state.episode.cancel();
            state.episode.acknowledge()?;
            if cancelled {
                debug!("episode cancelled by clerk");
            }
            Ok::<_, EngineError>(detection_snapshot(state))
        })?;

        self.disarm_timeout();
        self.inner.emitter.detection_changed(&snapshot);
        self.inner.emitter.notice(&Notice::info("Detection stopped"));
        Ok(snapshot)
    }

    /// Removes the cart line at `index`. Fails with `IndexOutOfRange` on an
    /// invalid index (a caller bug: the view should only offer rendered
    /// indices).
    pub fn remove_cart_item(&self, index: usize) -> EngineResult<CartSnapshot> {
        let (removed, cart) = self.with_state(|state| {
            let removed = state.cart.remove_at(index)?;
            Ok::<_, EngineError>((removed, cart_snapshot(state)))
        })?;

        info!(item = %removed.product.name, index, "cart item removed");
        self.inner.emitter.cart_changed(&cart);
        self.inner.emitter.notice(&Notice::success(format!(
            "Removed {} from cart",
            removed.product.name
        )));
        Ok(cart)
    }

    /// Empties the cart unconditionally. The session mirror is not rewound;
    /// it is best-effort history, not authoritative state.
    pub fn clear_cart(&self) -> CartSnapshot {
        let cart = self.with_state(|state| {
            state.cart.clear();
            cart_snapshot(state)
        });

        info!("cart cleared");
        self.inner.emitter.cart_changed(&cart);
        self.inner.emitter.notice(&Notice::info("Cart cleared"));
        cart
    }

    /// Commits the cart: returns the receipt data and leaves the ledger
    /// empty. Completes the durable session best-effort and closes it; the
    /// next `start_detection` opens a fresh one.
    pub fn checkout(&self) -> EngineResult<CheckoutReceipt> {
        let now_ms = Utc::now().timestamp_millis();

        let (summary, session_id, cart_after) = self.with_state(|state| {
            if state.cart.is_empty() {
                return Err(EngineError::EmptyCart);
            }
            let summary = state.cart.checkout();
            let session_id = state.session_id.take();
            Ok((summary, session_id, cart_snapshot(state)))
        })?;

        if let Some(session_id) = &session_id {
            self.spawn_session_complete(session_id.clone(), now_ms);
        }

        info!(
            items = summary.items.len(),
            amount = summary.totals.amount,
            weight = summary.totals.weight,
            "checkout committed"
        );
        self.inner.emitter.cart_changed(&cart_after);
        self.inner.emitter.notice(&Notice::success(format!(
            "Checkout complete - total ${:.2}",
            summary.totals.amount
        )));

        Ok(CheckoutReceipt {
            session_id,
            items: summary.items,
            totals: summary.totals,
            completed_at_ms: now_ms,
        })
    }

    // -------------------------------------------------------------------------
    // Read-Side (UI boundary)
    // -------------------------------------------------------------------------

    /// Current detection panel snapshot.
    pub fn detection(&self) -> DetectionSnapshot {
        self.with_state(|state| detection_snapshot(state))
    }

    /// Current cart panel snapshot.
    pub fn cart(&self) -> CartSnapshot {
        self.with_state(|state| cart_snapshot(state))
    }

    /// Durable session id for the current cart cycle, once created.
    pub fn session_id(&self) -> Option<String> {
        self.with_state(|state| state.session_id.clone())
    }

    /// Feed connectivity observed at connect time.
    pub fn is_connected(&self) -> bool {
        self.with_state(|state| state.connected)
    }

    /// Pull-style read of the freshest feed entry, for diagnostics display.
    /// Does not touch the episode: only subscribed deliveries drive state.
    pub fn latest_reading(&self) -> Option<Reading> {
        self.inner.feed.latest()
    }

    /// Reads the current session's mirrored record from the store.
    pub async fn session(&self) -> EngineResult<Option<SessionRecord>> {
        let Some(session_id) = self.session_id() else {
            return Ok(None);
        };
        Ok(self.inner.store.get(&session_id).await?)
    }

    /// Tears the engine down: unsubscribes from the feed and disarms the
    /// timeout so no callback can mutate a dead session.
    pub fn shutdown(&self) {
        self.disarm_timeout();
        if let Some(mut subscription) = self
            .inner
            .feed_subscription
            .lock()
            .expect("subscription slot poisoned")
            .take()
        {
            subscription.unsubscribe();
        }
        debug!("engine shut down");
    }

    // -------------------------------------------------------------------------
    // Event Handlers
    // -------------------------------------------------------------------------

    /// Feed delivery path: every callback invocation is treated as a
    /// potential duplicate or stale snapshot; the admission rules decide.
    fn handle_reading(&self, reading: Reading) {
        let (admission, snapshot) = self.with_state(|state| {
            let admission = state.episode.observe(&reading, &state.catalog);
            let snapshot = matches!(admission, Admission::Admissible { .. })
                .then(|| detection_snapshot(state));
            (admission, snapshot)
        });

        match admission {
            Admission::Admissible { product, weight } => {
                self.disarm_timeout();
                info!(item = %product.name, weight, "item detected");
                if let Some(snapshot) = snapshot {
                    self.inner.emitter.detection_changed(&snapshot);
                }
                self.inner.emitter.notice(&Notice::success(format!(
                    "Detected: {} ({:.2} kg)",
                    product.name, weight
                )));
            }
            Admission::StaleDiscard => {
                debug!(captured_at_ms = reading.captured_at_ms, "stale reading discarded");
            }
            Admission::SentinelDiscard => {
                debug!("no-item reading discarded");
            }
            Admission::ZeroWeightPending => {
                debug!(item = %reading.item_label, "item recognized, waiting for weight to settle");
            }
        }
    }

    /// Timer expiry path. The epoch check rejects a timer armed for an
    /// earlier episode; `time_out` itself rejects non-Active states, so a
    /// late timeout after resolution or cancellation is an ignorable no-op.
    fn handle_timeout(&self, episode_started_at_ms: i64) {
        let snapshot = self.with_state(|state| {
            if state.episode.started_at_ms() != Some(episode_started_at_ms) {
                return None;
            }
            if !state.episode.time_out() {
                return None;
            }
            Some(detection_snapshot(state))
        });

        if let Some(snapshot) = snapshot {
            info!("detection timed out with no admissible reading");
            self.inner.emitter.detection_changed(&snapshot);
            self.inner.emitter.notice(&Notice::warning(
                "No item detected. Place the item on the scale and start again.",
            ));
        }
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    /// Shared start path for `start_detection` and `rescan`: transitions the
    /// machine, opens a session when this cart cycle has none, arms the
    /// timeout, emits the detection change.
    fn begin_episode(&self) -> EngineResult<DetectionSnapshot> {
        let now_ms = Utc::now().timestamp_millis();

        let (snapshot, needs_session) = self.with_state(|state| {
            state.episode.start(now_ms)?;
            let needs_session = state.session_id.is_none() && !state.session_create_in_flight;
            if needs_session {
                state.session_create_in_flight = true;
            }
            Ok::<_, EngineError>((detection_snapshot(state), needs_session))
        })?;

        if needs_session {
            self.spawn_session_create(now_ms);
        }
        self.arm_timeout(now_ms);
        self.inner.emitter.detection_changed(&snapshot);
        Ok(snapshot)
    }

    fn with_state<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut EngineState) -> R,
    {
        let mut state = self.inner.state.lock().expect("engine state poisoned");
        f(&mut state)
    }

    /// Arms the detection timeout for the episode started at
    /// `episode_started_at_ms`, replacing (and aborting) any previous timer.
    fn arm_timeout(&self, episode_started_at_ms: i64) {
        let weak = Arc::downgrade(&self.inner);
        let timeout = self.inner.config.detection_timeout;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(inner) = weak.upgrade() {
                KioskEngine { inner }.handle_timeout(episode_started_at_ms);
            }
        });

        let mut slot = self.inner.timeout_task.lock().expect("timeout slot poisoned");
        if let Some(previous) = slot.replace(handle) {
            previous.abort();
        }
    }

    fn disarm_timeout(&self) {
        if let Some(handle) = self
            .inner
            .timeout_task
            .lock()
            .expect("timeout slot poisoned")
            .take()
        {
            handle.abort();
        }
    }

    fn spawn_session_create(&self, started_at_ms: i64) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let result = inner.store.create(started_at_ms).await;
            let mut state = inner.state.lock().expect("engine state poisoned");
            state.session_create_in_flight = false;
            match result {
                Ok(session_id) => {
                    info!(session_id = %session_id, "session mirror created");
                    state.session_id = Some(session_id);
                }
                Err(err) => {
                    drop(state);
                    warn!(error = %err, "session mirror create failed; continuing without mirror");
                    inner.emitter.notice(&Notice::warning(
                        "Session mirror unavailable - cart is unaffected",
                    ));
                }
            }
        });
    }

    fn spawn_session_append(&self, session_id: String, item: CartItem) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            if let Err(err) = inner.store.append_item(&session_id, &item).await {
                warn!(
                    session_id = %session_id,
                    error = %err,
                    "session mirror append failed; cart is unaffected"
                );
                inner.emitter.notice(&Notice::warning(
                    "Session mirror unavailable - cart is unaffected",
                ));
            }
        });
    }

    fn spawn_session_complete(&self, session_id: String, ended_at_ms: i64) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            if let Err(err) = inner.store.complete(&session_id, ended_at_ms).await {
                warn!(
                    session_id = %session_id,
                    error = %err,
                    "session mirror complete failed; checkout already committed"
                );
                inner.emitter.notice(&Notice::warning(
                    "Session mirror unavailable - receipt is unaffected",
                ));
            }
        });
    }
}
