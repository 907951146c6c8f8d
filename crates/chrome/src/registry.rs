//! Event fan-out to subscribers.
//!
//! Delivery policy: every sink is an unbounded channel and `broadcast`
//! only ever does a non-blocking send, so a slow consumer can never stall
//! the reader loop. Sinks whose receiver was dropped are pruned lazily on
//! the next broadcast for their method.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::protocol::Event;

/// How a sink matches inbound event methods.
#[derive(Debug, Clone)]
enum SinkKey {
    /// Exact method name, e.g. `"Page.loadEventFired"`.
    Method(String),
    /// Method prefix, e.g. `"Network."` for a whole domain.
    Prefix(String),
}

struct Sink {
    id: u64,
    tx: mpsc::UnboundedSender<Event>,
}

/// Registration handle returned by subscribe. Receive events with
/// [`Subscription::next`]; dropping the handle ends delivery (the registry
/// prunes the dead sink on the next matching broadcast).
pub struct Subscription {
    id: u64,
    key: SinkKey,
    rx: mpsc::UnboundedReceiver<Event>,
}

impl Subscription {
    /// Next event, or `None` once the connection is closed or the
    /// subscription was removed.
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    /// The method name or prefix this subscription matches.
    pub fn pattern(&self) -> &str {
        match &self.key {
            SinkKey::Method(m) | SinkKey::Prefix(m) => m,
        }
    }
}

pub(crate) struct Registry {
    exact: DashMap<String, Vec<Sink>>,
    prefixes: DashMap<String, Vec<Sink>>,
    next_id: AtomicU64,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            exact: DashMap::new(),
            prefixes: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub(crate) fn subscribe(&self, method: String) -> Subscription {
        let (id, tx, rx) = self.new_sink();
        self.exact.entry(method.clone()).or_default().push(Sink { id, tx });
        Subscription {
            id,
            key: SinkKey::Method(method),
            rx,
        }
    }

    pub(crate) fn subscribe_prefix(&self, prefix: String) -> Subscription {
        let (id, tx, rx) = self.new_sink();
        self.prefixes.entry(prefix.clone()).or_default().push(Sink { id, tx });
        Subscription {
            id,
            key: SinkKey::Prefix(prefix),
            rx,
        }
    }

    /// Remove the subscription's sink. Removing one that is already gone is
    /// a no-op.
    pub(crate) fn unsubscribe(&self, subscription: &Subscription) {
        let (map, key) = match &subscription.key {
            SinkKey::Method(m) => (&self.exact, m),
            SinkKey::Prefix(p) => (&self.prefixes, p),
        };
        if let Some(mut sinks) = map.get_mut(key) {
            sinks.retain(|sink| sink.id != subscription.id);
        }
    }

    /// Deliver an event to every sink registered for its method at this
    /// moment. Late subscribers miss it.
    pub(crate) fn broadcast(&self, event: Event) {
        if let Some(mut sinks) = self.exact.get_mut(&event.method) {
            sinks.retain(|sink| sink.tx.send(event.clone()).is_ok());
        }
        for mut entry in self.prefixes.iter_mut() {
            if event.method.starts_with(entry.key().as_str()) {
                entry.value_mut().retain(|sink| sink.tx.send(event.clone()).is_ok());
            }
        }
    }

    /// Drop every sink so all subscribers observe end-of-stream.
    pub(crate) fn clear(&self) {
        self.exact.clear();
        self.prefixes.clear();
    }

    fn new_sink(&self) -> (u64, mpsc::UnboundedSender<Event>, mpsc::UnboundedReceiver<Event>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        (id, tx, rx)
    }
}
