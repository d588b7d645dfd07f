//! # pipevisor
//!
//! **Pipevisor** runs named pipelines in isolated processes and streams their logs and
//! status transitions to any number of dynamically attached clients.
//!
//! It is the process-supervision and event-streaming layer of a dataflow backend: the
//! dataflow engine implements [`Pipeline`]; a transport (websocket, pipe, ...) implements
//! [`Client`].
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  ┌───────────────────────────────────────────────────────────────────┐
//!  │  PipelineManager (parent process)                                 │
//!  │  - registry: name → Pipeline                                      │
//!  │  - processes: name → ProcessHandle (pid)                          │
//!  │  - attachments: name → RunStatus + PipelineLogger                 │
//!  └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!         │ fork             │ fork             │ STATUS / "Interrupted by user"
//!         ▼                  ▼                  │
//!   ┌────────────┐     ┌────────────┐           │
//!   │ pipeline A │     │ pipeline B │           │
//!   │  run()     │     │  run()     │           │
//!   └─────┬──────┘     └─────┬──────┘           │
//!         │ LogRecord        │ LogRecord        │
//!         ▼                  ▼                  ▼
//!  ┌───────────────────────────────────────────────────────────────────┐
//!  │            EventBus queue (datagram socket pair)                  │
//!  └─────────────────────────────────┬─────────────────────────────────┘
//!                                    ▼
//!                       consumer task: translate()
//!                                    ▼
//!                              ClientSet (per-client queues)
//!                          ┌─────────┼─────────┐
//!                          ▼         ▼         ▼
//!                       client1   client2   clientN
//! ```
//!
//! ### Lifecycle of one run
//! ```text
//! start_pipeline(name)
//!   ├─► parent: STATUS: 2 (RUNNING)
//!   └─► child:  "Starting..." → run()
//!                 ├─ Ok    ─► "...done" → STATUS: 1 (FINISHED)
//!                 ├─ Err   ─► STATUS: 3 (FAILED) → error diagnostic
//!                 └─ panic ─► STATUS: 3 (FAILED) → panic message
//!
//! stop_pipeline(name)
//!   └─► SIGKILL → STATUS: 3 → "Interrupted by user" → detach
//! ```
//!
//! ## Features
//! | Area          | Description                                               | Key types / traits                          |
//! |---------------|-----------------------------------------------------------|---------------------------------------------|
//! | **Pipelines** | Define pipelines as types or closures.                    | [`Pipeline`], [`PipelineFn`], [`RunContext`]|
//! | **Lifecycle** | Start, stop and query pipelines by name.                  | [`PipelineManager`]                         |
//! | **Status**    | Cross-process status cell and its line protocol.          | [`RunStatus`], [`StatusCode`]               |
//! | **Events**    | Queue, consumer and client fan-out.                       | [`EventBus`], [`ClientEvent`], [`translate`]|
//! | **Clients**   | Event sinks attached at runtime.                          | [`Client`], [`ChannelClient`], [`JsonClient`]|
//! | **Errors**    | Typed errors for lifecycle and status operations.         | [`RuntimeError`], [`StatusError`]           |
//! | **Configuration** | Channel root, queue limits, send timeout.             | [`Config`]                                  |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] client _(demo/reference only)_.
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use pipevisor::{ChannelClient, Config, EventBus, PipelineFn, PipelineManager, RunContext};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bus = Arc::new(EventBus::new(Config::default()));
//!     bus.start()?;
//!
//!     let (client, mut events) = ChannelClient::new("ui");
//!     bus.add_client(client)?;
//!
//!     let manager = PipelineManager::new(Arc::clone(&bus));
//!     manager
//!         .add_pipeline(PipelineFn::arc("sum", |ctx: &RunContext| {
//!             ctx.unit("add").info(format!("result={}", 2 + 3));
//!             Ok(())
//!         }))
//!         .await;
//!     manager.start_pipeline("sum").await?;
//!
//!     while let Some(event) = events.recv().await {
//!         println!("{}", serde_json::to_string(&event)?);
//!     }
//!     Ok(())
//! }
//! ```
mod clients;
mod core;
mod error;
mod events;
mod pipelines;
mod status;

// ---- Public re-exports ----

pub use clients::{ChannelClient, Client, ClientSet, JsonClient};
pub use core::{Config, PipelineManager};
pub use error::{RuntimeError, StatusError, Target};
pub use events::{
    ClientEvent, EventBus, Level, LogEvent, LogRecord, Source, StatusEvent, TargetType, translate,
};
pub use pipelines::{Pipeline, PipelineFn, PipelineLogger, PipelineRef, RunContext};
pub use status::{NoopHook, RunStatus, StatusCode, StatusHook};

// Optional: expose a simple built-in logger client (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use clients::LogWriter;
