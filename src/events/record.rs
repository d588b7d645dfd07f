//! # Raw log records produced by pipelines.
//!
//! A [`LogRecord`] is what a pipeline (or the manager on its behalf) emits. Each record
//! carries a structured [`Source`] attached at emission time, so the consumer never has
//! to guess which pipeline or unit produced it.
//!
//! For interop with hierarchical logger names, [`Source::parse`] and
//! [`Source::channel`] convert to and from `<root>.<pipeline>[.<unit>]`.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Which pipeline (and optionally which unit inside it) produced a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Source {
    /// Unit name, for unit-level messages.
    pub unit: Option<String>,
    /// Pipeline name.
    pub pipeline: Option<String>,
}

impl Source {
    /// Source for pipeline-level messages.
    pub fn pipeline(name: impl Into<String>) -> Self {
        Self {
            unit: None,
            pipeline: Some(name.into()),
        }
    }

    /// Source for messages of `unit` inside `pipeline`.
    pub fn unit(pipeline: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            unit: Some(unit.into()),
            pipeline: Some(pipeline.into()),
        }
    }

    /// Parses a hierarchical channel name.
    ///
    /// The first segment is the root and is ignored:
    /// - `root.p`   → pipeline `p`
    /// - `root.p.u` → pipeline `p`, unit `u`
    /// - anything else → empty source
    ///
    /// ```
    /// use pipevisor::Source;
    ///
    /// assert_eq!(Source::parse("backend.calc.add"), Source::unit("calc", "add"));
    /// assert_eq!(Source::parse("backend.calc"), Source::pipeline("calc"));
    /// assert_eq!(Source::parse("backend"), Source::default());
    /// ```
    pub fn parse(channel: &str) -> Self {
        let segments: Vec<&str> = channel.split('.').collect();
        match segments.as_slice() {
            [_, pipeline] => Self::pipeline(*pipeline),
            [_, pipeline, unit] => Self::unit(*pipeline, *unit),
            _ => Self::default(),
        }
    }

    /// Renders the hierarchical channel name under `root`.
    pub fn channel(&self, root: &str) -> String {
        match (&self.pipeline, &self.unit) {
            (Some(p), Some(u)) => format!("{root}.{p}.{u}"),
            (Some(p), None) => format!("{root}.{p}"),
            _ => root.to_string(),
        }
    }
}

/// Severity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        })
    }
}

/// One log entry travelling through the event queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Wall-clock timestamp taken by the producer.
    pub at: SystemTime,
    /// Producer descriptor.
    pub source: Source,
    /// Severity.
    pub level: Level,
    /// Message text; may be an encoded status line.
    pub message: String,
}

impl LogRecord {
    /// Creates a record stamped with the current time.
    pub fn new(source: Source, level: Level, message: impl Into<String>) -> Self {
        Self {
            at: SystemTime::now(),
            source,
            level,
            message: message.into(),
        }
    }

    /// Creates a record from a hierarchical channel name.
    pub fn from_channel(channel: &str, level: Level, message: impl Into<String>) -> Self {
        Self::new(Source::parse(channel), level, message)
    }

    /// Timestamp as fractional seconds since the Unix epoch.
    pub fn unix_time(&self) -> f64 {
        self.at
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default()
    }

    /// Cuts the message down to at most `max` bytes on a char boundary.
    pub(crate) fn truncate_message(&mut self, max: usize) {
        if self.message.len() <= max {
            return;
        }
        let mut end = max;
        while !self.message.is_char_boundary(end) {
            end -= 1;
        }
        self.message.truncate(end);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_render_channels() {
        assert_eq!(
            Source::parse("root.myppl.myunit"),
            Source::unit("myppl", "myunit")
        );
        assert_eq!(Source::parse("root.myppl"), Source::pipeline("myppl"));
        assert_eq!(Source::parse("root"), Source::default());
        assert_eq!(Source::parse("root.a.b.c"), Source::default());

        assert_eq!(Source::unit("p", "u").channel("backend"), "backend.p.u");
        assert_eq!(Source::pipeline("p").channel("backend"), "backend.p");
        assert_eq!(Source::default().channel("backend"), "backend");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let mut rec = LogRecord::new(Source::pipeline("p"), Level::Info, "aé");
        rec.truncate_message(2);
        assert_eq!(rec.message, "a");

        let mut rec = LogRecord::new(Source::pipeline("p"), Level::Info, "short");
        rec.truncate_message(64);
        assert_eq!(rec.message, "short");
    }

    #[test]
    fn survives_the_wire() {
        let rec = LogRecord::new(Source::unit("p", "u"), Level::Error, "boom");
        let bytes = serde_json::to_vec(&rec).unwrap();
        let back: LogRecord = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, rec);
    }
}
