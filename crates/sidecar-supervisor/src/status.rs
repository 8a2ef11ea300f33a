//! Status broadcast for the supervised backend.
//!
//! The hub owns the current lifecycle state together with the latest status
//! text. Every transition and advisory note is published to all live
//! subscribers while the hub's lock is held, so each subscriber observes
//! events in generation order and a synchronous read of [`StatusHub::current`]
//! never runs ahead of the last event delivered.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

use tracing::info;

use crate::LIFECYCLE_TARGET;
use crate::state::LifecycleState;

const INITIAL_MESSAGE: &str = "Backend not started";

/// Immutable record of one status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEvent {
    /// Position of the event in the hub's publication order.
    pub sequence: u64,
    /// Wall-clock time the event was published.
    pub timestamp: SystemTime,
    /// Human-readable status text.
    pub message: String,
    /// Lifecycle state in effect when the event was published.
    pub state: LifecycleState,
}

/// Receiving end of a status subscription.
///
/// Dropping the subscription detaches it; the hub prunes it on the next
/// publication.
#[derive(Debug)]
pub struct StatusSubscription {
    receiver: Receiver<StatusEvent>,
}

impl StatusSubscription {
    /// Blocks until the next event arrives or the hub is dropped.
    pub fn recv(&self) -> Option<StatusEvent> {
        self.receiver.recv().ok()
    }

    /// Waits at most `timeout` for the next event.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<StatusEvent> {
        match self.receiver.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Drains every event already delivered without blocking.
    pub fn try_iter(&self) -> impl Iterator<Item = StatusEvent> + '_ {
        self.receiver.try_iter()
    }
}

#[derive(Debug)]
struct HubInner {
    state: LifecycleState,
    message: String,
    next_sequence: u64,
    subscribers: Vec<Sender<StatusEvent>>,
}

/// Owner of the lifecycle state and its subscriber list.
#[derive(Debug)]
pub struct StatusHub {
    inner: Mutex<HubInner>,
}

impl Default for StatusHub {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusHub {
    /// Builds a hub in the [`LifecycleState::Idle`] state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HubInner {
                state: LifecycleState::Idle,
                message: INITIAL_MESSAGE.to_owned(),
                next_sequence: 0,
                subscribers: Vec::new(),
            }),
        }
    }

    /// Moves to `state` and publishes `message`.
    pub fn transition(&self, state: LifecycleState, message: impl Into<String>) -> StatusEvent {
        let event = Self::publish(&mut self.lock(), state, message.into());
        log_event(&event);
        event
    }

    /// Moves to `state` unless a start or stop already owns the lifecycle.
    ///
    /// Returns `false`, publishing nothing, when the current state blocks a
    /// new start.
    pub fn transition_unless_busy(&self, state: LifecycleState, message: impl Into<String>) -> bool {
        let event = {
            let mut inner = self.lock();
            if inner.state.blocks_start() {
                return false;
            }
            Self::publish(&mut inner, state, message.into())
        };
        log_event(&event);
        true
    }

    /// Moves from `expected` to `state`, publishing nothing when another
    /// transition got there first.
    pub fn transition_from(
        &self,
        expected: LifecycleState,
        state: LifecycleState,
        message: impl Into<String>,
    ) -> bool {
        self.transition_when(|current| current == expected, state, message)
    }

    /// Moves to `state` only while `allowed` accepts the current state.
    pub fn transition_when(
        &self,
        allowed: impl FnOnce(LifecycleState) -> bool,
        state: LifecycleState,
        message: impl Into<String>,
    ) -> bool {
        let event = {
            let mut inner = self.lock();
            if !allowed(inner.state) {
                return false;
            }
            Self::publish(&mut inner, state, message.into())
        };
        log_event(&event);
        true
    }

    /// Publishes advisory text without changing the lifecycle state.
    pub fn note(&self, message: impl Into<String>) -> StatusEvent {
        let event = {
            let mut inner = self.lock();
            let state = inner.state;
            Self::publish(&mut inner, state, message.into())
        };
        log_event(&event);
        event
    }

    /// Registers a subscriber that receives every event published from now on.
    pub fn subscribe(&self) -> StatusSubscription {
        let (sender, receiver) = mpsc::channel();
        self.lock().subscribers.push(sender);
        StatusSubscription { receiver }
    }

    /// Returns the current state and status text.
    pub fn current(&self) -> (LifecycleState, String) {
        let inner = self.lock();
        (inner.state, inner.message.clone())
    }

    /// Number of subscribers still attached after the last publication.
    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    fn lock(&self) -> MutexGuard<'_, HubInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(inner: &mut HubInner, state: LifecycleState, message: String) -> StatusEvent {
        inner.state = state;
        inner.message.clone_from(&message);
        let event = StatusEvent {
            sequence: inner.next_sequence,
            timestamp: SystemTime::now(),
            message,
            state,
        };
        inner.next_sequence += 1;
        // Unbounded channels never block the publisher; dead receivers drop out.
        inner
            .subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
        event
    }
}

/// Logged after the hub lock is released; a subscriber's writer may itself
/// query the hub.
fn log_event(event: &StatusEvent) {
    info!(
        target: LIFECYCLE_TARGET,
        state = %event.state,
        sequence = event.sequence,
        "{}",
        event.message
    );
}
