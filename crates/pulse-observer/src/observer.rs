//! Pulse observer — stored load, strategy, and subscriber notification.
//!
//! The observer holds one durable value, the last accepted load, starting
//! at idle. An accepted reading is stored and then announced to every
//! subscriber, in registration order, before the intercepted response is
//! handed back to the caller. Identical consecutive readings are still
//! announced.
//!
//! Store-and-notify runs under a single writer lock, so concurrent
//! in-flight requests never interleave their notifications. The
//! subscriber list is snapshotted before callbacks run, which lets a
//! callback subscribe or cancel (itself or others) without deadlock.
//! A reading fed back into the observer from inside a callback is queued
//! and announced once the current round has finished.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::{self, ThreadId};

use http::HeaderMap;
use tracing::{debug, trace};

use pulse_core::{
    ConfigResult, LoadValue, ObserverConfig, PULSE_HEADER, StrategyTier, ThresholdTable,
};

type Callback = Arc<dyn Fn(LoadValue) + Send + Sync>;

/// Anything that exposes response headers.
pub trait PulseCarrier {
    fn pulse_headers(&self) -> &HeaderMap;
}

impl<B> PulseCarrier for http::Response<B> {
    fn pulse_headers(&self) -> &HeaderMap {
        self.headers()
    }
}

impl PulseCarrier for http::response::Parts {
    fn pulse_headers(&self) -> &HeaderMap {
        &self.headers
    }
}

impl PulseCarrier for HeaderMap {
    fn pulse_headers(&self) -> &HeaderMap {
        self
    }
}

struct Shared {
    thresholds: ThresholdTable,
    /// `f64` bits of the last accepted load.
    load_bits: AtomicU64,
    subscribers: Mutex<Vec<(u64, Callback)>>,
    next_id: AtomicU64,
    /// Serializes store-and-notify.
    writer: Mutex<()>,
    /// Thread currently running store-and-notify, if any.
    notifying: Mutex<Option<ThreadId>>,
    /// Readings fed back by callbacks, announced after the current round.
    pending: Mutex<VecDeque<LoadValue>>,
}

impl Shared {
    fn subscribers(&self) -> MutexGuard<'_, Vec<(u64, Callback)>> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notifying(&self) -> MutexGuard<'_, Option<ThreadId>> {
        self.notifying.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn pending(&self) -> MutexGuard<'_, VecDeque<LoadValue>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Marks the current thread as the notifier for the lifetime of a round.
struct NotifyingGuard<'a> {
    shared: &'a Shared,
}

impl<'a> NotifyingGuard<'a> {
    fn enter(shared: &'a Shared, thread: ThreadId) -> Self {
        *shared.notifying() = Some(thread);
        Self { shared }
    }
}

impl Drop for NotifyingGuard<'_> {
    fn drop(&mut self) {
        // A panicking callback must not leave readings for the next round.
        self.shared.pending().clear();
        *self.shared.notifying() = None;
    }
}

/// Passive load tracker. Cloning yields another handle to the same state.
#[derive(Clone)]
pub struct PulseObserver {
    shared: Arc<Shared>,
}

impl PulseObserver {
    /// Create an observer starting at idle.
    pub fn new(config: ObserverConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                thresholds: config.thresholds,
                load_bits: AtomicU64::new(LoadValue::IDLE.get().to_bits()),
                subscribers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
                writer: Mutex::new(()),
                notifying: Mutex::new(None),
                pending: Mutex::new(VecDeque::new()),
            }),
        }
    }

    /// Create an observer with custom thresholds, validating their order.
    pub fn with_thresholds(aggressive_max: f64, conservative_max: f64) -> ConfigResult<Self> {
        let thresholds = ThresholdTable::new(aggressive_max, conservative_max)?;
        Ok(Self::new(ObserverConfig { thresholds }))
    }

    pub fn thresholds(&self) -> ThresholdTable {
        self.shared.thresholds
    }

    /// Last accepted load.
    pub fn current_load(&self) -> LoadValue {
        LoadValue::clamped(f64::from_bits(self.shared.load_bits.load(Ordering::Acquire)))
    }

    pub fn current_strategy(&self) -> StrategyTier {
        self.shared.thresholds.classify(self.current_load())
    }

    /// `true` unless the current strategy is `Blocked`.
    pub fn should_prefetch(&self) -> bool {
        self.current_strategy().allows_prefetch()
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.subscribers().len()
    }

    /// Register a callback for every accepted reading.
    ///
    /// Callbacks run synchronously on the task that received the response.
    /// They may subscribe or cancel freely. A subscriber added during a
    /// round is first called in the next one. Readings a callback feeds
    /// back into this observer are stored and announced after the
    /// current round.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(LoadValue) + Send + Sync + 'static,
    {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        self.shared.subscribers().push((id, Arc::new(callback)));
        trace!(id, "pulse subscriber added");
        Subscription {
            id,
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Extract the pulse header and, if valid, store and announce it.
    ///
    /// Returns the accepted value. Missing or malformed headers change
    /// nothing.
    pub fn observe_headers(&self, headers: &HeaderMap) -> Option<LoadValue> {
        let raw = headers.get(&PULSE_HEADER)?;
        match LoadValue::from_header(raw) {
            Ok(load) => {
                self.publish(load);
                Some(load)
            }
            Err(e) => {
                debug!(error = %e, "ignoring malformed pulse header");
                None
            }
        }
    }

    /// Await a request and learn from its response.
    ///
    /// Errors from the request pass through untouched.
    pub async fn intercept<Fut, R, E>(&self, request: Fut) -> Result<R, E>
    where
        Fut: Future<Output = Result<R, E>>,
        R: PulseCarrier,
    {
        let response = request.await?;
        self.observe_headers(response.pulse_headers());
        Ok(response)
    }

    /// Wrap a request-performing function so that every call is
    /// intercepted.
    pub fn wrap<F>(&self, perform: F) -> Instrumented<F> {
        Instrumented {
            observer: self.clone(),
            perform,
        }
    }

    fn publish(&self, load: LoadValue) {
        let current = thread::current().id();
        if *self.shared.notifying() == Some(current) {
            trace!(%load, "pulse fed back from a callback, deferred");
            self.shared.pending().push_back(load);
            return;
        }

        let _writer = self
            .shared
            .writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let _round = NotifyingGuard::enter(&self.shared, current);

        let mut next = Some(load);
        while let Some(load) = next {
            self.announce(load);
            next = self.shared.pending().pop_front();
        }
    }

    fn announce(&self, load: LoadValue) {
        self.shared
            .load_bits
            .store(load.get().to_bits(), Ordering::Release);

        let snapshot: Vec<Callback> = self
            .shared
            .subscribers()
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();

        debug!(
            %load,
            strategy = %self.shared.thresholds.classify(load),
            subscribers = snapshot.len(),
            "pulse observed"
        );

        for callback in snapshot {
            callback(load);
        }
    }
}

impl Default for PulseObserver {
    fn default() -> Self {
        Self::new(ObserverConfig::default())
    }
}

impl std::fmt::Debug for PulseObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PulseObserver")
            .field("load", &self.current_load())
            .field("thresholds", &self.shared.thresholds)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Handle to a registered callback.
///
/// Dropping the handle does not cancel the subscription; call `cancel()`.
/// The handle holds only a weak reference and never keeps the observer
/// alive.
#[derive(Debug, Clone)]
pub struct Subscription {
    id: u64,
    shared: Weak<Shared>,
}

impl Subscription {
    /// Remove exactly this callback. Idempotent; returns whether a
    /// callback was removed by this call.
    pub fn cancel(&self) -> bool {
        let Some(shared) = self.shared.upgrade() else {
            return false;
        };
        let mut subscribers = shared.subscribers();
        let before = subscribers.len();
        subscribers.retain(|(id, _)| *id != self.id);
        let removed = subscribers.len() != before;
        if removed {
            trace!(id = self.id, "pulse subscriber cancelled");
        }
        removed
    }

    /// Whether the callback is still registered.
    pub fn is_active(&self) -> bool {
        let Some(shared) = self.shared.upgrade() else {
            return false;
        };
        let active = shared.subscribers().iter().any(|(id, _)| *id == self.id);
        active
    }
}

/// A request function instrumented by a `PulseObserver`.
#[derive(Clone)]
pub struct Instrumented<F> {
    observer: PulseObserver,
    perform: F,
}

impl<F> Instrumented<F> {
    /// Perform a request through the wrapped function.
    pub async fn call<Req, Fut, R, E>(&self, request: Req) -> Result<R, E>
    where
        F: Fn(Req) -> Fut,
        Fut: Future<Output = Result<R, E>>,
        R: PulseCarrier,
    {
        self.observer.intercept((self.perform)(request)).await
    }

    pub fn observer(&self) -> &PulseObserver {
        &self.observer
    }

    pub fn into_inner(self) -> F {
        self.perform
    }
}
