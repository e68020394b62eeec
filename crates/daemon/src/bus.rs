// SPDX-License-Identifier: MIT

//! Event Bus (spec 4.1): one per run, holding append-only history plus a
//! live-subscriber fan-out list.
//!
//! Grounded in the teacher's `oj-daemon::event_bus::EventBus`
//! (`wal` + `wake_tx` single-consumer wake-up), generalized from one waiting
//! reader to an arbitrary number of concurrent subscribers, with in-memory
//! history replacing the WAL — durability is the Persistence Store's job
//! (spec 6), not the bus's.
//!
//! History and the subscriber list share one `parking_lot::Mutex` so that
//! "snapshot history, then begin receiving everything published after" is
//! one atomic operation — without that, a late subscriber could miss an
//! event published between a separate history-read and subscribe-register.

use fleet_core::AgentEvent;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

/// Opaque handle returned by [`EventBus::subscribe`], used only to
/// deregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriberId(u64);

struct Subscriber {
    id: SubscriberId,
    tx: mpsc::UnboundedSender<AgentEvent>,
}

#[derive(Default)]
struct BusState {
    history: Vec<AgentEvent>,
    subscribers: Vec<Subscriber>,
}

#[derive(Default)]
pub struct EventBus {
    state: Mutex<BusState>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `event` to history, then fans it out to every live
    /// subscriber. A subscriber whose channel is closed is dropped from the
    /// list rather than surfaced as an error — satisfies Testable Property 3
    /// (a failing subscriber must not affect others or the publisher).
    pub fn publish(&self, event: AgentEvent) {
        let mut state = self.state.lock();
        state.history.push(event.clone());
        state.subscribers.retain(|sub| sub.tx.send(event.clone()).is_ok());
    }

    /// Registers a new subscriber and atomically snapshots history so the
    /// caller can replay it before forwarding events read from the returned
    /// receiver (spec 4.1's "replay is performed by the stream front-end").
    pub fn subscribe(&self) -> (SubscriberId, Vec<AgentEvent>, mpsc::UnboundedReceiver<AgentEvent>) {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.lock();
        state.subscribers.push(Subscriber { id, tx });
        (id, state.history.clone(), rx)
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        self.state.lock().subscribers.retain(|sub| sub.id != id);
    }

    /// All events recorded so far, in publish order.
    pub fn history(&self) -> Vec<AgentEvent> {
        self.state.lock().history.clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.lock().subscribers.len()
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
