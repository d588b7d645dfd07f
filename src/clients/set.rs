//! # ClientSet: mutable fan-out over live clients.
//!
//! [`ClientSet`] distributes each [`ClientEvent`] to every registered client **without
//! awaiting** their processing, and lets clients join and leave while events flow.
//!
//! ## What it guarantees
//! - `emit` returns immediately.
//! - Per-client FIFO (queue order); delivery attempts follow registration order.
//! - `emit` and `add`/`remove` exclude each other: an event is offered either to the set
//!   before a change or to the set after it, never to a half-updated one.
//! - A removed client still receives everything enqueued for it before removal.
//! - Panics inside clients are caught and logged (isolation).
//!
//! ## What it does **not** guarantee
//! - No global ordering across different clients.
//! - No retries on per-client queue overflow (events are dropped for that client).
//!
//! ## Diagram
//! ```text
//!    emit(Arc<ClientEvent>)              (read lock)
//!        │                        (Arc-clone per client)
//!        ├────────────────► [queue C1] ─► worker C1 ─► send()
//!        ├────────────────► [queue C2] ─► worker C2 ─► send()
//!        └────────────────► [queue CN] ─► worker CN ─► send()
//!
//!    add(client) / remove(id)            (write lock)
//! ```

use std::sync::{Arc, PoisonError, RwLock};

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::clients::Client;
use crate::events::ClientEvent;

/// Per-client channel with metadata.
struct ClientSlot {
    id: Arc<str>,
    sender: mpsc::Sender<Arc<ClientEvent>>,
    worker: JoinHandle<()>,
}

/// Fan-out with per-client bounded queues and worker tasks.
pub struct ClientSet {
    slots: RwLock<Vec<ClientSlot>>,
    default_capacity: usize,
}

impl ClientSet {
    /// Creates an empty set; clients without a preferred capacity get `default_capacity`.
    #[must_use]
    pub fn new(default_capacity: usize) -> Self {
        Self {
            slots: RwLock::new(Vec::new()),
            default_capacity: default_capacity.max(1),
        }
    }

    /// Registers a client and spawns its worker.
    ///
    /// A client with an already registered id replaces the old one, which drains its
    /// queue and stops. Returns `true` if a client was replaced.
    ///
    /// Must be called within a Tokio runtime.
    pub fn add(&self, client: Arc<dyn Client>) -> bool {
        let cap = client
            .queue_capacity()
            .unwrap_or(self.default_capacity)
            .max(1);
        let id: Arc<str> = Arc::from(client.id());
        let (tx, rx) = mpsc::channel::<Arc<ClientEvent>>(cap);
        let worker = tokio::spawn(Self::worker(client, rx));
        let slot = ClientSlot {
            id: Arc::clone(&id),
            sender: tx,
            worker,
        };

        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        match slots.iter().position(|s| s.id == id) {
            Some(idx) => {
                slots[idx] = slot;
                tracing::warn!(client = %id, "client replaced by a new registration");
                true
            }
            None => {
                slots.push(slot);
                false
            }
        }
    }

    /// Unregisters a client; returns `false` if `id` is unknown.
    ///
    /// The worker keeps running until it has delivered everything already queued.
    pub fn remove(&self, id: &str) -> bool {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        match slots.iter().position(|s| &*s.id == id) {
            Some(idx) => {
                // Dropping the sender lets the worker drain and exit.
                drop(slots.remove(idx));
                true
            }
            None => false,
        }
    }

    /// Fan-out one event to all clients (non-blocking).
    ///
    /// If a client's queue is **full** or **closed**, the event is dropped for it
    /// and a warning is logged with the client's id.
    pub fn emit(&self, event: Arc<ClientEvent>) {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        for slot in slots.iter() {
            match slot.sender.try_send(Arc::clone(&event)) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(client = %slot.id, "client dropped event: queue full");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::warn!(client = %slot.id, "client dropped event: worker closed");
                }
            }
        }
    }

    /// Ids of registered clients in delivery order.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots.iter().map(|s| s.id.to_string()).collect()
    }

    /// Graceful shutdown: unregister everyone, close all queues and await worker completion.
    pub async fn shutdown(&self) {
        let slots: Vec<ClientSlot> = {
            let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
            slots.drain(..).collect()
        };
        for slot in slots {
            drop(slot.sender);
            let _ = slot.worker.await;
        }
    }

    async fn worker(client: Arc<dyn Client>, mut rx: mpsc::Receiver<Arc<ClientEvent>>) {
        while let Some(ev) = rx.recv().await {
            let fut = client.send(ev.as_ref());
            match std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(client = %client.id(), error = %e, "client send failed");
                }
                Err(panic_err) => {
                    let info = if let Some(msg) = panic_err.downcast_ref::<&'static str>() {
                        (*msg).to_string()
                    } else if let Some(msg) = panic_err.downcast_ref::<String>() {
                        msg.clone()
                    } else {
                        "unknown panic".to_string()
                    };
                    tracing::warn!(client = %client.id(), panic = %info, "client panicked");
                }
            }
        }
    }
}

impl Default for ClientSet {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::time::timeout;

    use super::*;
    use crate::clients::ChannelClient;
    use crate::events::{Level, LogRecord, translate};

    struct Panicky;

    #[async_trait]
    impl Client for Panicky {
        fn id(&self) -> &str {
            "panicky"
        }

        async fn send(&self, _event: &ClientEvent) -> io::Result<()> {
            panic!("client bug");
        }
    }

    fn event(msg: &str) -> Arc<ClientEvent> {
        Arc::new(translate(&LogRecord::from_channel(
            "backend.p",
            Level::Info,
            msg,
        )))
    }

    #[tokio::test]
    async fn panicking_client_does_not_affect_others() {
        let set = ClientSet::default();
        set.add(Arc::new(Panicky));
        let (client, mut rx) = ChannelClient::new("ok");
        set.add(client);

        set.emit(event("one"));
        set.emit(event("two"));
        for expected in ["one", "two"] {
            let ev = timeout(Duration::from_secs(5), rx.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(ev.as_log().unwrap().msg, expected);
        }
        set.shutdown().await;
        assert!(set.ids().is_empty());
    }

    #[tokio::test]
    async fn duplicate_id_replaces_previous_client() {
        let set = ClientSet::new(4);
        let (first, mut first_rx) = ChannelClient::new("dup");
        let (second, mut second_rx) = ChannelClient::new("dup");
        assert!(!set.add(first));
        assert!(set.add(second));
        assert_eq!(set.ids(), vec!["dup"]);

        set.emit(event("x"));
        let ev = timeout(Duration::from_secs(5), second_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ev.as_log().unwrap().msg, "x");
        assert!(timeout(Duration::from_secs(5), first_rx.recv())
            .await
            .unwrap()
            .is_none());

        assert!(set.remove("dup"));
        assert!(!set.remove("dup"));
    }
}
