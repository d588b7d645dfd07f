//! # Producer end of the event queue.
//!
//! The queue is a connected `AF_UNIX` datagram socket pair. The consumer owns one end;
//! every producer holds a [`LogRoute`] wrapping the other. Forked pipeline processes
//! inherit the descriptor, which makes the queue process-safe without extra plumbing.
//!
//! ## Rules
//! - One record = one datagram, so records from different producers never interleave.
//! - Messages are truncated to `max_message_bytes` before encoding.
//! - The encoded datagram never exceeds the consumer's receive buffer: escape-heavy
//!   messages are cut further until the JSON form fits.
//! - Sends honor the socket write timeout; a timed-out record is dropped.
//! - A route whose pipeline was removed from the bus drops records silently.
//! - No `tracing` here: routes are used from forked children.

use std::io;
use std::os::unix::net::UnixDatagram;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::core::Config;
use crate::events::record::LogRecord;

/// Handle that pushes records into the bus queue.
#[derive(Clone, Debug)]
pub(crate) struct LogRoute {
    tx: Arc<UnixDatagram>,
    enabled: Arc<AtomicBool>,
    max_message_bytes: usize,
    max_datagram_bytes: usize,
}

impl LogRoute {
    pub(crate) fn new(tx: Arc<UnixDatagram>, enabled: Arc<AtomicBool>, cfg: &Config) -> Self {
        Self {
            tx,
            enabled,
            max_message_bytes: cfg.max_message_bytes,
            max_datagram_bytes: cfg.datagram_capacity(),
        }
    }

    #[inline]
    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Encodes and sends one record.
    pub(crate) fn send(&self, record: LogRecord) -> io::Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }
        let bytes = self.encode(record)?;
        self.tx.send(&bytes)?;
        Ok(())
    }

    /// JSON form of `record`, with the message shortened until it fits one datagram.
    fn encode(&self, mut record: LogRecord) -> io::Result<Vec<u8>> {
        record.truncate_message(self.max_message_bytes);
        loop {
            let bytes = serde_json::to_vec(&record).map_err(io::Error::other)?;
            if bytes.len() <= self.max_datagram_bytes {
                return Ok(bytes);
            }
            if record.message.is_empty() {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "record envelope exceeds the datagram limit",
                ));
            }
            // Shrink in proportion to the overshoot; always by at least one byte.
            let len = record.message.len();
            let target = len * self.max_datagram_bytes / bytes.len();
            record.truncate_message(target.min(len - 1));
        }
    }
}
