//! # Client trait.
//!
//! Provides [`Client`] an extension point for plugging event sinks (websocket connections,
//! channels, writers) into the [`EventBus`](crate::EventBus).
//!
//! Each client gets:
//! - **Dedicated worker task** (runs independently)
//! - **Per-client bounded queue** (capacity via [`Client::queue_capacity`] or the bus config)
//! - **Panic isolation** (panics are caught and logged)
//!
//! ## Architecture
//! ```text
//! ClientSet ──► [bounded queue] ──► worker task ──► client.send()
//!                                    └─► Err / panic → tracing::warn!, event skipped
//! ```
//!
//! ## Rules
//! - A slow client only affects its own queue.
//! - Queue overflow drops the event **for this client only**.
//! - Events are processed sequentially (FIFO) per client.
//! - Send failures are not retried; reconnect logic belongs to the transport.
//!
//! ## Example
//! ```rust
//! use std::io;
//! use async_trait::async_trait;
//! use pipevisor::{Client, ClientEvent};
//!
//! struct Console;
//!
//! #[async_trait]
//! impl Client for Console {
//!     fn id(&self) -> &str { "console" }
//!
//!     async fn send(&self, event: &ClientEvent) -> io::Result<()> {
//!         println!("{event:?}");
//!         Ok(())
//!     }
//! }
//! ```

use std::io;

use async_trait::async_trait;

use crate::events::ClientEvent;

/// Event sink attached to the bus.
///
/// ### Implementation requirements
/// - Use async I/O; avoid blocking the executor.
/// - Return transport failures as `Err`; do not panic.
/// - `id` must be stable: it is the key for [`EventBus::remove_client`](crate::EventBus::remove_client).
#[async_trait]
pub trait Client: Send + Sync + 'static {
    /// Returns the client identifier.
    fn id(&self) -> &str;

    /// Delivers a single event.
    ///
    /// Called from a dedicated worker task, in FIFO order per client.
    async fn send(&self, event: &ClientEvent) -> io::Result<()>;

    /// Returns the preferred queue capacity, or `None` for the bus default.
    ///
    /// The runtime clamps capacity to a minimum of 1.
    fn queue_capacity(&self) -> Option<usize> {
        None
    }
}
