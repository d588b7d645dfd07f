//! Error types used by the pipevisor runtime.
//!
//! This module defines two error enums:
//!
//! - [`StatusError`]: a value outside the three valid status codes.
//! - [`RuntimeError`]: lifecycle violations raised by the manager and the event bus.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging/metrics.
//!
//! Failures inside a pipeline's `run()` never surface here: they are contained in the
//! pipeline's process and reported to clients as a `FAILED` status plus a log entry.

use std::fmt;
use std::io;

use thiserror::Error;

/// # Invalid status value.
///
/// Status codes are never clamped or coerced; anything other than
/// `1` (finished), `2` (running) or `3` (failed) is rejected.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StatusError {
    /// The value is not one of the three status codes.
    #[error("invalid status: {value}")]
    Invalid {
        /// The rejected input, as received.
        value: String,
    },
}

impl StatusError {
    pub(crate) fn invalid(value: impl fmt::Display) -> Self {
        StatusError::Invalid {
            value: value.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use pipevisor::StatusCode;
    ///
    /// let err = StatusCode::validate(4).unwrap_err();
    /// assert_eq!(err.as_label(), "status_invalid");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            StatusError::Invalid { .. } => "status_invalid",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            StatusError::Invalid { value } => format!("invalid status value={value:?}"),
        }
    }
}

/// What a lifecycle error refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// The event bus consumer.
    Bus,
    /// A named pipeline.
    Pipeline(String),
    /// A named client subscription.
    Client(String),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Bus => f.write_str("event bus"),
            Target::Pipeline(name) => write!(f, "pipeline '{name}'"),
            Target::Client(id) => write!(f, "client '{id}'"),
        }
    }
}

/// # Errors produced by the pipevisor runtime.
///
/// Raised synchronously to the caller of [`PipelineManager`](crate::PipelineManager)
/// and [`EventBus`](crate::EventBus) operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Start requested while a live process exists, or the bus is started twice.
    #[error("{target} is already running")]
    AlreadyRunning {
        /// What was already running.
        target: Target,
    },

    /// Stop (or a bus mutation) requested with nothing running.
    #[error("{target} is not running")]
    NotRunning {
        /// What was expected to be running.
        target: Target,
    },

    /// Lookup of an unregistered name.
    #[error("{target} not found")]
    NotFound {
        /// What was looked up.
        target: Target,
    },

    /// The pipeline process could not be created.
    #[error("failed to spawn pipeline process: {0}")]
    Spawn(#[source] io::Error),

    /// The event queue could not be created or cloned.
    #[error("event queue error: {0}")]
    Queue(#[source] io::Error),

    /// A status write was rejected.
    #[error(transparent)]
    Status(#[from] StatusError),
}

impl RuntimeError {
    pub(crate) fn already_running(target: Target) -> Self {
        RuntimeError::AlreadyRunning { target }
    }

    pub(crate) fn not_running(target: Target) -> Self {
        RuntimeError::NotRunning { target }
    }

    pub(crate) fn not_found(target: Target) -> Self {
        RuntimeError::NotFound { target }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use pipevisor::{RuntimeError, Target};
    ///
    /// let err = RuntimeError::NotFound { target: Target::Pipeline("calc".into()) };
    /// assert_eq!(err.as_label(), "runtime_not_found");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::AlreadyRunning { .. } => "runtime_already_running",
            RuntimeError::NotRunning { .. } => "runtime_not_running",
            RuntimeError::NotFound { .. } => "runtime_not_found",
            RuntimeError::Spawn(_) => "runtime_spawn_failed",
            RuntimeError::Queue(_) => "runtime_queue_failed",
            RuntimeError::Status(e) => e.as_label(),
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::AlreadyRunning { target } => format!("already running: {target}"),
            RuntimeError::NotRunning { target } => format!("not running: {target}"),
            RuntimeError::NotFound { target } => format!("not found: {target}"),
            RuntimeError::Spawn(e) => format!("spawn: {e}"),
            RuntimeError::Queue(e) => format!("queue: {e}"),
            RuntimeError::Status(e) => e.as_message(),
        }
    }
}
