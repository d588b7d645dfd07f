//! # Event clients for the pipevisor bus.
//!
//! This module provides the [`Client`] trait, the [`ClientSet`] fan-out used by the
//! [`EventBus`](crate::EventBus) consumer, and built-in clients.
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   pipeline process ── LogRecord ──► queue ──► bus consumer ──► translate()
//!                                                                  │
//!                                                           ClientSet::emit()
//!                                                                  │
//!                                              ┌──────────┬────────┴─────┬─────────┐
//!                                              ▼          ▼              ▼         ▼
//!                                        ChannelClient JsonClient   LogWriter   Custom
//! ```
//!
//! ## Built-in clients
//! - [`ChannelClient`] forwards events to an in-process receiver (transport bridge)
//! - [`JsonClient`] writes newline-delimited JSON to an async writer
//! - `LogWriter` prints events to stdout (feature `logging`)

mod channel;
mod client;
mod json;
#[cfg(feature = "logging")]
mod log;
mod set;

pub use channel::ChannelClient;
pub use client::Client;
pub use json::JsonClient;
#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::ClientSet;
