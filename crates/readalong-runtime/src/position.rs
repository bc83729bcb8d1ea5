#![forbid(unsafe_code)]

//! Playback position input.
//!
//! The engine consumes positions from a host-provided [`PositionSource`].
//! Notifications can come from any thread (audio callbacks usually do), so
//! they land in a [`LatestPosition`] mailbox that keeps only the newest
//! value. The engine drains it once per frame; superseded positions carry
//! no side effects and are dropped.
//!
//! Subscriptions are scoped: [`PositionSubscription`] unsubscribes when it
//! is dropped.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Position-change callback.
pub type PositionCallback = Arc<dyn Fn(u64) + Send + Sync>;

/// Identifier returned by [`PositionSource::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// An external provider of playback position.
pub trait PositionSource: Send + Sync {
    /// Current position in milliseconds.
    fn position_ms(&self) -> u64;

    /// Register a callback for position changes.
    fn subscribe(&self, callback: PositionCallback) -> SubscriptionId;

    /// Remove a callback. Unknown ids are ignored.
    fn unsubscribe(&self, id: SubscriptionId);
}

// ---------------------------------------------------------------------------
// LatestPosition
// ---------------------------------------------------------------------------

/// Single-slot mailbox where the newest position wins.
#[derive(Debug, Clone, Default)]
pub struct LatestPosition {
    inner: Arc<Mailbox>,
}

#[derive(Debug, Default)]
struct Mailbox {
    slot: Mutex<Option<u64>>,
    superseded: AtomicU64,
}

impl LatestPosition {
    /// Create an empty mailbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `position_ms`, replacing any value not yet taken.
    pub fn offer(&self, position_ms: u64) {
        if self.slot().replace(position_ms).is_some() {
            self.inner.superseded.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Take the newest position, leaving the mailbox empty.
    pub fn take(&self) -> Option<u64> {
        self.slot().take()
    }

    /// Newest position without taking it.
    pub fn peek(&self) -> Option<u64> {
        *self.slot()
    }

    /// Drop any pending position.
    pub fn clear(&self) {
        self.slot().take();
    }

    /// Positions dropped because a newer one arrived first.
    pub fn superseded(&self) -> u64 {
        self.inner.superseded.load(Ordering::Relaxed)
    }

    fn slot(&self) -> MutexGuard<'_, Option<u64>> {
        // An `Option<u64>` cannot be left half-written.
        self.inner
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

// ---------------------------------------------------------------------------
// PositionSubscription
// ---------------------------------------------------------------------------

/// A live subscription, released on drop.
pub struct PositionSubscription {
    source: Arc<dyn PositionSource>,
    id: Option<SubscriptionId>,
}

impl fmt::Debug for PositionSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PositionSubscription")
            .field("id", &self.id)
            .finish()
    }
}

impl PositionSubscription {
    /// Subscribe `mailbox` to `source`.
    ///
    /// The source's current position is offered immediately so the first
    /// frame has a value without waiting for a change.
    pub fn attach(source: Arc<dyn PositionSource>, mailbox: &LatestPosition) -> Self {
        let sink = mailbox.clone();
        let id = source.subscribe(Arc::new(move |ms| sink.offer(ms)));
        mailbox.offer(source.position_ms());
        tracing::debug!(id = id.0, "position source attached");
        Self {
            source,
            id: Some(id),
        }
    }

    /// Subscription id, until released.
    pub fn id(&self) -> Option<SubscriptionId> {
        self.id
    }

    /// The subscribed source.
    pub fn source(&self) -> &Arc<dyn PositionSource> {
        &self.source
    }

    /// Unsubscribe now. Idempotent.
    pub fn release(&mut self) {
        if let Some(id) = self.id.take() {
            self.source.unsubscribe(id);
            tracing::debug!(id = id.0, "position source detached");
        }
    }
}

impl Drop for PositionSubscription {
    fn drop(&mut self) {
        self.release();
    }
}

// ---------------------------------------------------------------------------
// ManualPositionSource
// ---------------------------------------------------------------------------

/// A position source driven by explicit calls.
///
/// Used by the replay tool and tests; hosts with a real player implement
/// [`PositionSource`] on top of it.
#[derive(Default)]
pub struct ManualPositionSource {
    state: Mutex<ManualState>,
}

#[derive(Default)]
struct ManualState {
    position_ms: u64,
    next_id: u64,
    subscribers: Vec<(SubscriptionId, PositionCallback)>,
}

impl fmt::Debug for ManualPositionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("ManualPositionSource")
            .field("position_ms", &state.position_ms)
            .field("subscribers", &state.subscribers.len())
            .finish()
    }
}

impl ManualPositionSource {
    /// Create a source at position 0 with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move to `position_ms` and notify every subscriber.
    ///
    /// Callbacks run after the internal lock is released, so they may
    /// subscribe or unsubscribe.
    pub fn set_position(&self, position_ms: u64) {
        let callbacks: Vec<PositionCallback> = {
            let mut state = self.state();
            state.position_ms = position_ms;
            state.subscribers.iter().map(|(_, cb)| Arc::clone(cb)).collect()
        };
        for callback in callbacks {
            callback(position_ms);
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.state().subscribers.len()
    }

    fn state(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PositionSource for ManualPositionSource {
    fn position_ms(&self) -> u64 {
        self.state().position_ms
    }

    fn subscribe(&self, callback: PositionCallback) -> SubscriptionId {
        let mut state = self.state();
        state.next_id += 1;
        let id = SubscriptionId(state.next_id);
        state.subscribers.push((id, callback));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.state().subscribers.retain(|(sid, _)| *sid != id);
    }
}
