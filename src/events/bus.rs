//! # Event bus: process-safe queue plus a single fan-out consumer.
//!
//! [`EventBus`] owns the queue every pipeline logs into and the background task that turns
//! queued [`LogRecord`]s into [`ClientEvent`]s for the registered clients.
//!
//! ## Architecture
//! ```text
//! Producers (many processes):             Consumer (one task):
//!   pipeline A (forked) ──┐
//!   pipeline B (forked) ──┼──► datagram ───► consume() ──► translate() ──► ClientSet
//!   manager (parent)    ──┘     queue          (select: cancel | recv)       (read lock)
//!
//! Mutations (parent only):
//!   add_client / remove_client ──► ClientSet (write lock, consumer keeps running)
//!   add_pipeline / remove_pipeline ──► route enable flags
//! ```
//!
//! ## Rules
//! - Every mutating operation requires the bus to be running (`NotRunning` otherwise).
//! - `start` begins with an empty client set; `stop` drains and drops all clients.
//! - Records from one producer reach each client in submission order.
//! - Best-effort: malformed or oversized datagrams are dropped with a warning.
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use pipevisor::{ChannelClient, Config, EventBus};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bus = Arc::new(EventBus::new(Config::default()));
//!     bus.start()?;
//!
//!     let (client, mut events) = ChannelClient::new("ui-1");
//!     bus.add_client(client)?;
//!
//!     let logger = bus.add_pipeline("calc")?;
//!     logger.info("hello");
//!     println!("{:?}", events.recv().await);
//!
//!     bus.stop().await?;
//!     Ok(())
//! }
//! ```

use std::collections::HashMap;
use std::os::unix::net::UnixDatagram as StdUnixDatagram;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::net::UnixDatagram;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::clients::{Client, ClientSet};
use crate::core::Config;
use crate::error::{RuntimeError, Target};
use crate::events::event::translate;
use crate::events::record::LogRecord;
use crate::events::route::LogRoute;
use crate::pipelines::PipelineLogger;

/// Both ends of the queue.
struct Queue {
    tx: Arc<StdUnixDatagram>,
    rx: Arc<UnixDatagram>,
}

impl Queue {
    fn open(cfg: &Config) -> std::io::Result<Self> {
        let (tx, rx) = StdUnixDatagram::pair()?;
        tx.set_write_timeout(cfg.send_timeout())?;
        rx.set_nonblocking(true)?;
        Ok(Self {
            tx: Arc::new(tx),
            rx: Arc::new(UnixDatagram::from_std(rx)?),
        })
    }
}

/// Handle to the running consumer task.
struct Consumer {
    token: CancellationToken,
    join: JoinHandle<()>,
}

#[derive(Default)]
struct BusState {
    queue: Option<Queue>,
    consumer: Option<Consumer>,
    /// Routed pipelines and the enable flag shared by their loggers.
    pipelines: HashMap<String, Arc<AtomicBool>>,
}

/// Central log/status fan-out service.
pub struct EventBus {
    cfg: Config,
    root: Arc<str>,
    clients: Arc<ClientSet>,
    state: Mutex<BusState>,
}

impl EventBus {
    /// Creates a stopped bus.
    pub fn new(cfg: Config) -> Self {
        Self {
            root: Arc::from(cfg.root.as_str()),
            clients: Arc::new(ClientSet::new(cfg.client_queue_capacity_clamped())),
            state: Mutex::new(BusState::default()),
            cfg,
        }
    }

    /// Returns the bus configuration.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// True while the consumer runs.
    pub fn is_running(&self) -> bool {
        self.lock().consumer.is_some()
    }

    /// Starts the consumer. The queue is created on first start and reused afterwards.
    ///
    /// Must be called within a Tokio runtime.
    pub fn start(&self) -> Result<(), RuntimeError> {
        let mut st = self.lock();
        if st.consumer.is_some() {
            return Err(RuntimeError::already_running(Target::Bus));
        }

        let rx = match &st.queue {
            Some(queue) => Arc::clone(&queue.rx),
            None => {
                let queue = Queue::open(&self.cfg).map_err(RuntimeError::Queue)?;
                let rx = Arc::clone(&queue.rx);
                st.queue = Some(queue);
                rx
            }
        };

        let token = CancellationToken::new();
        let join = tokio::spawn(consume(
            rx,
            Arc::clone(&self.clients),
            token.clone(),
            self.cfg.datagram_capacity(),
        ));
        st.consumer = Some(Consumer { token, join });
        tracing::debug!("event bus started");
        Ok(())
    }

    /// Stops the consumer, then drains and drops every client.
    ///
    /// Records still in the queue stay there until the next start.
    pub async fn stop(&self) -> Result<(), RuntimeError> {
        let consumer = self
            .lock()
            .consumer
            .take()
            .ok_or_else(|| RuntimeError::not_running(Target::Bus))?;

        consumer.token.cancel();
        if let Err(e) = consumer.join.await {
            tracing::error!(error = %e, "event bus consumer panicked");
        }
        self.clients.shutdown().await;
        tracing::debug!("event bus stopped");
        Ok(())
    }

    /// Routes a pipeline into the queue and returns its logger.
    ///
    /// Adding an already routed pipeline returns another logger on the same route.
    pub fn add_pipeline(&self, name: &str) -> Result<PipelineLogger, RuntimeError> {
        let mut st = self.lock();
        let tx = Self::running_queue(&st)?;
        let enabled = Arc::clone(
            st.pipelines
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(AtomicBool::new(true))),
        );
        let route = LogRoute::new(tx, enabled, &self.cfg);
        tracing::debug!(pipeline = %name, "pipeline routed into event bus");
        Ok(PipelineLogger::routed(Arc::clone(&self.root), name, route))
    }

    /// Unroutes a pipeline; loggers handed out for it stop forwarding in this process.
    pub fn remove_pipeline(&self, name: &str) -> Result<(), RuntimeError> {
        let mut st = self.lock();
        Self::running_queue(&st)?;
        let enabled = st
            .pipelines
            .remove(name)
            .ok_or_else(|| RuntimeError::not_found(Target::Pipeline(name.to_string())))?;
        enabled.store(false, Ordering::Release);
        tracing::debug!(pipeline = %name, "pipeline removed from event bus");
        Ok(())
    }

    /// Registers a client; it receives every event dispatched after this call returns.
    pub fn add_client(&self, client: Arc<dyn Client>) -> Result<(), RuntimeError> {
        let st = self.lock();
        Self::running_queue(&st)?;
        let id = client.id().to_string();
        self.clients.add(client);
        tracing::debug!(client = %id, "client added");
        Ok(())
    }

    /// Unregisters a client; events already dispatched to it are still delivered.
    pub fn remove_client(&self, id: &str) -> Result<(), RuntimeError> {
        let st = self.lock();
        Self::running_queue(&st)?;
        if !self.clients.remove(id) {
            return Err(RuntimeError::not_found(Target::Client(id.to_string())));
        }
        tracing::debug!(client = %id, "client removed");
        Ok(())
    }

    /// Pushes a record from the current process into the queue.
    ///
    /// Blocks for up to [`Config::send_timeout`] while the queue is full; async callers
    /// should go through `tokio::task::spawn_blocking`.
    pub fn publish(&self, record: LogRecord) -> Result<(), RuntimeError> {
        let tx = Self::running_queue(&self.lock())?;
        let route = LogRoute::new(tx, Arc::new(AtomicBool::new(true)), &self.cfg);
        route.send(record).map_err(RuntimeError::Queue)
    }

    /// Ids of registered clients in delivery order.
    pub fn clients(&self) -> Vec<String> {
        self.clients.ids()
    }

    /// Sorted names of routed pipelines.
    pub fn pipelines(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().pipelines.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    fn lock(&self) -> MutexGuard<'_, BusState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the producer end if the consumer is running.
    fn running_queue(st: &BusState) -> Result<Arc<StdUnixDatagram>, RuntimeError> {
        match (&st.consumer, &st.queue) {
            (Some(_), Some(queue)) => Ok(Arc::clone(&queue.tx)),
            _ => Err(RuntimeError::not_running(Target::Bus)),
        }
    }
}

impl Drop for EventBus {
    fn drop(&mut self) {
        if let Some(consumer) = self.lock().consumer.take() {
            consumer.token.cancel();
        }
    }
}

/// Receives records until cancelled and fans them out.
async fn consume(
    rx: Arc<UnixDatagram>,
    clients: Arc<ClientSet>,
    token: CancellationToken,
    capacity: usize,
) {
    let mut buf = vec![0u8; capacity];
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            res = rx.recv(&mut buf) => match res {
                Ok(n) => match serde_json::from_slice::<LogRecord>(&buf[..n]) {
                    Ok(record) => clients.emit(Arc::new(translate(&record))),
                    Err(e) => tracing::warn!(error = %e, bytes = n, "dropping malformed record"),
                },
                Err(e) => {
                    tracing::error!(error = %e, "event queue receive failed");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc::UnboundedReceiver;
    use tokio::time::timeout;

    use super::*;
    use crate::clients::ChannelClient;
    use crate::events::{ClientEvent, Level, Source, TargetType};
    use crate::status::StatusCode;

    async fn next(rx: &mut UnboundedReceiver<ClientEvent>) -> ClientEvent {
        timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("event in time")
            .expect("channel open")
    }

    fn msg(ev: &ClientEvent) -> &str {
        &ev.as_log().expect("log event").msg
    }

    #[tokio::test]
    async fn lifecycle_guards() {
        let bus = EventBus::new(Config::default());
        assert!(!bus.is_running());
        assert!(matches!(
            bus.stop().await,
            Err(RuntimeError::NotRunning { target: Target::Bus })
        ));
        assert!(matches!(
            bus.add_pipeline("p"),
            Err(RuntimeError::NotRunning { .. })
        ));
        let (client, _rx) = ChannelClient::new("c");
        assert!(matches!(
            bus.add_client(client),
            Err(RuntimeError::NotRunning { .. })
        ));
        assert!(matches!(
            bus.remove_client("c"),
            Err(RuntimeError::NotRunning { .. })
        ));

        bus.start().unwrap();
        assert!(bus.is_running());
        assert!(matches!(
            bus.start(),
            Err(RuntimeError::AlreadyRunning { target: Target::Bus })
        ));
        assert!(matches!(
            bus.remove_client("nobody"),
            Err(RuntimeError::NotFound { .. })
        ));
        assert!(matches!(
            bus.remove_pipeline("nobody"),
            Err(RuntimeError::NotFound { .. })
        ));
        bus.stop().await.unwrap();
        assert!(!bus.is_running());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn translates_and_preserves_producer_order() {
        let bus = EventBus::new(Config::default());
        bus.start().unwrap();
        let (client, mut rx) = ChannelClient::new("ui");
        bus.add_client(client).unwrap();

        let log = bus.add_pipeline("calc").unwrap();
        log.status(StatusCode::Running);
        for i in 0..50 {
            log.unit("add").info(format!("step {i}"));
        }

        let first = next(&mut rx).await;
        let status = first.as_status().expect("status first");
        assert_eq!(status.status, StatusCode::Running);
        assert_eq!(status.target_type, TargetType::Pipeline);
        assert_eq!(status.target, "calc");

        for i in 0..50 {
            let ev = next(&mut rx).await;
            let log = ev.as_log().expect("log event");
            assert_eq!(log.src, Source::unit("calc", "add"));
            assert_eq!(log.msg, format!("step {i}"));
        }
        bus.stop().await.unwrap();
    }

    #[tokio::test]
    async fn removed_client_keeps_earlier_events_only() {
        let bus = EventBus::new(Config::default());
        bus.start().unwrap();
        let (leaving, mut leaving_rx) = ChannelClient::new("leaving");
        let (staying, mut staying_rx) = ChannelClient::new("staying");
        bus.add_client(leaving).unwrap();
        bus.add_client(staying).unwrap();
        assert_eq!(bus.clients(), vec!["leaving", "staying"]);

        let log = bus.add_pipeline("p").unwrap();
        log.info("before");
        // Once the later client has it, dispatch to both has happened.
        assert_eq!(msg(&next(&mut staying_rx).await), "before");

        bus.remove_client("leaving").unwrap();
        log.info("after");
        assert_eq!(msg(&next(&mut staying_rx).await), "after");

        assert_eq!(msg(&next(&mut leaving_rx).await), "before");
        let end = timeout(Duration::from_secs(5), leaving_rx.recv())
            .await
            .expect("worker exits");
        assert!(end.is_none());

        bus.stop().await.unwrap();
    }

    #[tokio::test]
    async fn client_added_late_sees_later_events() {
        let bus = EventBus::new(Config::default());
        bus.start().unwrap();
        let (early, mut early_rx) = ChannelClient::new("early");
        bus.add_client(early).unwrap();

        let log = bus.add_pipeline("p").unwrap();
        log.info("one");
        assert_eq!(msg(&next(&mut early_rx).await), "one");

        let (late, mut late_rx) = ChannelClient::new("late");
        bus.add_client(late).unwrap();
        log.info("two");
        assert_eq!(msg(&next(&mut early_rx).await), "two");
        assert_eq!(msg(&next(&mut late_rx).await), "two");

        bus.stop().await.unwrap();
    }

    #[tokio::test]
    async fn removed_pipeline_stops_forwarding() {
        let bus = EventBus::new(Config::default());
        bus.start().unwrap();
        let (client, mut rx) = ChannelClient::new("ui");
        bus.add_client(client).unwrap();

        let gone = bus.add_pipeline("gone").unwrap();
        let kept = bus.add_pipeline("kept").unwrap();
        assert_eq!(bus.pipelines(), vec!["gone", "kept"]);

        bus.remove_pipeline("gone").unwrap();
        assert!(!gone.is_routed());
        gone.info("dropped");
        kept.info("delivered");

        let ev = next(&mut rx).await;
        assert_eq!(ev.pipeline(), Some("kept"));
        assert_eq!(msg(&ev), "delivered");
        bus.stop().await.unwrap();
    }

    #[tokio::test]
    async fn restart_begins_with_no_clients() {
        let bus = EventBus::new(Config::default());
        bus.start().unwrap();
        let (client, _rx) = ChannelClient::new("ui");
        bus.add_client(client).unwrap();
        bus.stop().await.unwrap();

        bus.start().unwrap();
        assert!(bus.clients().is_empty());

        let (client, mut rx) = ChannelClient::new("ui");
        bus.add_client(client).unwrap();
        bus.publish(LogRecord::from_channel("backend.p", Level::Warn, "again"))
            .unwrap();
        assert_eq!(msg(&next(&mut rx).await), "again");
        bus.stop().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn oversized_messages_arrive_truncated() {
        let cfg = Config {
            max_message_bytes: 1024,
            ..Config::default()
        };
        let bus = EventBus::new(cfg);
        bus.start().unwrap();
        let (client, mut rx) = ChannelClient::new("ui");
        bus.add_client(client).unwrap();
        let log = bus.add_pipeline("p").unwrap();

        log.info("a".repeat(5000));
        assert_eq!(msg(&next(&mut rx).await), "a".repeat(1024));

        // Under the limit, doubles once escaped, still fits: delivered whole.
        let escaped = "\"\n".repeat(500);
        log.error(escaped.clone());
        assert_eq!(msg(&next(&mut rx).await), escaped);

        // Under the limit, grows sixfold once escaped: cut until it fits.
        log.error("\u{1}".repeat(1000));
        let ev = next(&mut rx).await;
        let got = msg(&ev);
        assert!(!got.is_empty() && got.len() < 1000);
        assert!(got.chars().all(|c| c == '\u{1}'));

        log.info("after");
        assert_eq!(msg(&next(&mut rx).await), "after");
        bus.stop().await.unwrap();
    }
}
