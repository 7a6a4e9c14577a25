//! Application service: per-installation event fan-out.
//!
//! Emission never blocks and never fails. A subscriber that went away is
//! pruned on the next emission.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use siteforge_common::{EventEnvelope, ProvisionEvent};
use tokio::sync::mpsc;

/// Receiving end of one subscription.
#[derive(Debug)]
pub struct Subscription {
    pub id: u64,
    pub receiver: mpsc::UnboundedReceiver<EventEnvelope>,
}

#[derive(Debug, Default)]
struct State {
    next_sequence: u64,
    next_subscriber: u64,
    subscribers: Vec<(u64, mpsc::UnboundedSender<EventEnvelope>)>,
}

/// Typed event channel for one installation.
#[derive(Debug)]
pub struct EventEmitter {
    installation_id: String,
    state: Mutex<State>,
}

impl EventEmitter {
    #[must_use]
    pub fn new(installation_id: impl Into<String>) -> Self {
        Self {
            installation_id: installation_id.into(),
            state: Mutex::new(State::default()),
        }
    }

    #[must_use]
    pub fn installation_id(&self) -> &str {
        &self.installation_id
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a listener. It receives every event emitted from now on.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.lock();
        let id = state.next_subscriber;
        state.next_subscriber += 1;
        state.subscribers.push((id, tx));
        Subscription { id, receiver: rx }
    }

    /// Remove a listener. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: u64) -> bool {
        let mut state = self.lock();
        let before = state.subscribers.len();
        state.subscribers.retain(|(sid, _)| *sid != id);
        state.subscribers.len() != before
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    /// Wrap `event` in an envelope and deliver it to every live subscriber.
    ///
    /// Returns the sequence number assigned to the event.
    pub fn emit(&self, event: ProvisionEvent) -> u64 {
        let mut state = self.lock();
        let sequence = state.next_sequence;
        state.next_sequence += 1;
        let envelope = EventEnvelope {
            installation_id: self.installation_id.clone(),
            sequence,
            timestamp: Utc::now(),
            event,
        };
        // Sending under the lock keeps every subscriber's view in sequence order.
        state
            .subscribers
            .retain(|(_, tx)| tx.send(envelope.clone()).is_ok());
        sequence
    }

    pub fn output(&self, line: impl Into<String>) {
        self.emit(ProvisionEvent::Output { line: line.into() });
    }

    pub fn warning(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(installation_id = %self.installation_id, %message, "tolerated failure");
        self.emit(ProvisionEvent::Warning { message });
    }
}
