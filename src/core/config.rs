//! # Global runtime configuration.
//!
//! Provides [`Config`] centralized settings for the event bus and the loggers it hands out.
//!
//! Config is used in two ways:
//! 1. **Bus creation**: `EventBus::new(config)`
//! 2. **Logger routing**: every [`PipelineLogger`](crate::PipelineLogger) returned by
//!    `EventBus::add_pipeline` carries the channel root and message limits.
//!
//! ## Sentinel values
//! - `send_timeout = 0s` → producers block until the queue accepts the record
//! - `client_queue_capacity = 0` → clamped to 1

use std::time::Duration;

/// Global configuration for the pipevisor runtime.
///
/// ## Field semantics
/// - `root`: first segment of every hierarchical channel name (`<root>.<pipeline>[.<unit>]`)
/// - `client_queue_capacity`: per-client event queue size (min 1)
/// - `max_message_bytes`: longer log messages are truncated before they enter the queue
/// - `send_timeout`: how long a producer may wait on a full queue before dropping a record
///
/// ## Notes
/// All fields are public for flexibility. Prefer the helper accessors to avoid
/// sprinkling sentinel checks across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// Root segment of hierarchical channel names.
    ///
    /// Records whose channel does not start with a single root segment followed by
    /// a pipeline name (and optionally a unit name) are treated as sourceless.
    pub root: String,

    /// Capacity of each client's event queue.
    ///
    /// When a client falls this far behind, new events are dropped for that client only.
    pub client_queue_capacity: usize,

    /// Maximum size of a single log message in bytes.
    ///
    /// Every record travels as one datagram of at most this plus 4 KiB once encoded;
    /// messages whose JSON escaping would exceed that are cut further.
    pub max_message_bytes: usize,

    /// Write timeout applied to the producer side of the event queue.
    ///
    /// - `Duration::ZERO` = block until the consumer drains the queue
    /// - `> 0` = give up and drop the record after this long
    pub send_timeout: Duration,
}

impl Config {
    /// Returns the client queue capacity clamped to a minimum of 1.
    #[inline]
    pub fn client_queue_capacity_clamped(&self) -> usize {
        self.client_queue_capacity.max(1)
    }

    /// Returns the producer write timeout as an `Option`.
    ///
    /// - `None` → block
    /// - `Some(d)` → drop the record after `d`
    #[inline]
    pub fn send_timeout(&self) -> Option<Duration> {
        if self.send_timeout == Duration::ZERO {
            None
        } else {
            Some(self.send_timeout)
        }
    }

    /// Size of the consumer's receive buffer: message limit plus room for the envelope.
    #[inline]
    pub(crate) fn datagram_capacity(&self) -> usize {
        self.max_message_bytes.max(1) + 4096
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `root = "backend"`
    /// - `client_queue_capacity = 1024`
    /// - `max_message_bytes = 32 KiB` (fits the default datagram socket buffer)
    /// - `send_timeout = 1s`
    fn default() -> Self {
        Self {
            root: "backend".to_string(),
            client_queue_capacity: 1024,
            max_message_bytes: 32 * 1024,
            send_timeout: Duration::from_secs(1),
        }
    }
}
