//! # Pipeline loggers.
//!
//! A [`PipelineLogger`] is the hierarchical log channel of one pipeline
//! (`<root>.<pipeline>`), and [`PipelineLogger::unit`] derives the channel of a unit inside it
//! (`<root>.<pipeline>.<unit>`). Records carry the structured [`Source`] rather than the
//! rendered channel name.
//!
//! Loggers obtained from [`EventBus::add_pipeline`](crate::EventBus::add_pipeline) are routed
//! into the bus queue. A [`detached`](PipelineLogger::detached) logger silently drops records.
//!
//! Logging is fire-and-forget and safe to use from the pipeline's forked process.

use std::io;
use std::sync::Arc;

use crate::events::{Level, LogRecord, LogRoute, Source};
use crate::status::StatusCode;

/// Log channel of a pipeline or of one of its units.
#[derive(Clone, Debug)]
pub struct PipelineLogger {
    root: Arc<str>,
    source: Source,
    route: Option<LogRoute>,
}

impl PipelineLogger {
    pub(crate) fn routed(root: Arc<str>, pipeline: &str, route: LogRoute) -> Self {
        Self {
            root,
            source: Source::pipeline(pipeline),
            route: Some(route),
        }
    }

    /// Logger that is not connected to any bus.
    pub fn detached(root: impl Into<Arc<str>>, pipeline: &str) -> Self {
        Self {
            root: root.into(),
            source: Source::pipeline(pipeline),
            route: None,
        }
    }

    /// Derives the logger of `unit` inside this logger's pipeline.
    #[must_use]
    pub fn unit(&self, unit: &str) -> Self {
        let pipeline = self.source.pipeline.clone().unwrap_or_default();
        Self {
            root: Arc::clone(&self.root),
            source: Source::unit(pipeline, unit),
            route: self.route.clone(),
        }
    }

    /// Structured source attached to every record.
    pub fn source(&self) -> &Source {
        &self.source
    }

    /// Hierarchical channel name, e.g. `backend.calc.add`.
    pub fn channel(&self) -> String {
        self.source.channel(&self.root)
    }

    /// True if records currently reach a bus.
    pub fn is_routed(&self) -> bool {
        self.route.as_ref().is_some_and(|r| r.is_enabled())
    }

    /// Emits a record, reporting queue errors.
    ///
    /// A detached logger accepts and drops the record.
    pub fn try_log(&self, level: Level, message: impl Into<String>) -> io::Result<()> {
        match &self.route {
            Some(route) => route.send(LogRecord::new(self.source.clone(), level, message)),
            None => Ok(()),
        }
    }

    /// Emits a record; delivery is best-effort.
    pub fn log(&self, level: Level, message: impl Into<String>) {
        let _ = self.try_log(level, message);
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log(Level::Debug, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(Level::Info, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(Level::Warn, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(Level::Error, message);
    }

    /// Announces a status transition on this channel (`STATUS: <code>`).
    pub fn status(&self, status: StatusCode) {
        self.log(Level::Info, status.encode());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_logger_extends_the_channel() {
        let log = PipelineLogger::detached("backend", "calc");
        assert_eq!(log.channel(), "backend.calc");
        assert!(!log.is_routed());

        let unit = log.unit("add");
        assert_eq!(unit.channel(), "backend.calc.add");
        assert_eq!(unit.source(), &Source::unit("calc", "add"));
    }

    #[test]
    fn detached_logger_drops_records() {
        let log = PipelineLogger::detached("backend", "calc");
        assert!(log.try_log(Level::Info, "nobody listens").is_ok());
    }

    #[test]
    fn routed_logger_writes_one_datagram_per_record() {
        let (tx, rx) = std::os::unix::net::UnixDatagram::pair().unwrap();
        let enabled = Arc::new(std::sync::atomic::AtomicBool::new(true));
        let cfg = crate::core::Config {
            max_message_bytes: 16,
            ..crate::core::Config::default()
        };
        let route = LogRoute::new(Arc::new(tx), enabled, &cfg);
        let log = PipelineLogger::routed(Arc::from("backend"), "calc", route);

        log.unit("add").status(StatusCode::Running);
        log.info("a message longer than sixteen bytes");

        let mut buf = [0u8; 4096];
        let n = rx.recv(&mut buf).unwrap();
        let first: LogRecord = serde_json::from_slice(&buf[..n]).unwrap();
        assert_eq!(first.source, Source::unit("calc", "add"));
        assert_eq!(first.message, "STATUS: 2");

        let n = rx.recv(&mut buf).unwrap();
        let second: LogRecord = serde_json::from_slice(&buf[..n]).unwrap();
        assert_eq!(second.source, Source::pipeline("calc"));
        assert_eq!(second.message, "a message longer");
    }
}
