//! # Client-facing events and the record translator.
//!
//! [`translate`] turns a raw [`LogRecord`] into a [`ClientEvent`]:
//!
//! ```text
//! LogRecord { source, message }
//!     │
//!     ├─ message decodes as "STATUS: <code>" and source names a pipeline
//!     │      └─► ClientEvent::Status { target_type: unit | pipeline, target }
//!     │
//!     └─ otherwise
//!            └─► ClientEvent::Log { src: { unit, pipeline }, msg }
//! ```
//!
//! ## Wire schema
//! Events serialize adjacently tagged, ready for any transport:
//! ```text
//! {"type":"status","content":{"time":..,"status":2,"target_type":"unit","target":"add"}}
//! {"type":"log","content":{"time":..,"src":{"unit":"add","pipeline":"calc"},"level":"info","msg":".."}}
//! ```
//!
//! ## Example
//! ```rust
//! use pipevisor::{ClientEvent, Level, LogRecord, StatusCode, TargetType, translate};
//!
//! let rec = LogRecord::from_channel("backend.calc.add", Level::Info, "STATUS: 2");
//! match translate(&rec) {
//!     ClientEvent::Status(ev) => {
//!         assert_eq!(ev.status, StatusCode::Running);
//!         assert_eq!(ev.target_type, TargetType::Unit);
//!         assert_eq!(ev.target, "add");
//!     }
//!     other => panic!("unexpected {other:?}"),
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::events::record::{Level, LogRecord, Source};
use crate::status::StatusCode;

/// What a status event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    /// A unit inside a pipeline.
    Unit,
    /// A whole pipeline.
    Pipeline,
}

/// Status transition of a pipeline or unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEvent {
    /// Producer timestamp, seconds since the Unix epoch.
    pub time: f64,
    /// New status.
    pub status: StatusCode,
    /// Unit- or pipeline-targeted.
    pub target_type: TargetType,
    /// Unit name if unit-targeted, pipeline name otherwise.
    pub target: String,
}

/// Free-form log message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    /// Producer timestamp, seconds since the Unix epoch.
    pub time: f64,
    /// Producer, if known.
    pub src: Source,
    /// Severity.
    pub level: Level,
    /// Message text.
    pub msg: String,
}

/// Structured event delivered to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "lowercase")]
pub enum ClientEvent {
    Status(StatusEvent),
    Log(LogEvent),
}

impl ClientEvent {
    #[inline]
    pub fn is_status(&self) -> bool {
        matches!(self, ClientEvent::Status(_))
    }

    /// Returns the status event, if this is one.
    pub fn as_status(&self) -> Option<&StatusEvent> {
        match self {
            ClientEvent::Status(ev) => Some(ev),
            ClientEvent::Log(_) => None,
        }
    }

    /// Returns the log event, if this is one.
    pub fn as_log(&self) -> Option<&LogEvent> {
        match self {
            ClientEvent::Log(ev) => Some(ev),
            ClientEvent::Status(_) => None,
        }
    }

    /// Name of the pipeline this event concerns, if any.
    pub fn pipeline(&self) -> Option<&str> {
        match self {
            ClientEvent::Status(ev) if ev.target_type == TargetType::Pipeline => Some(&ev.target),
            ClientEvent::Status(_) => None,
            ClientEvent::Log(ev) => ev.src.pipeline.as_deref(),
        }
    }
}

/// Converts a raw record into the event sent to clients.
pub fn translate(record: &LogRecord) -> ClientEvent {
    let time = record.unix_time();

    if let (Some(status), Some(pipeline)) = (
        StatusCode::decode(&record.message),
        record.source.pipeline.as_ref(),
    ) {
        let (target_type, target) = match &record.source.unit {
            Some(unit) => (TargetType::Unit, unit.clone()),
            None => (TargetType::Pipeline, pipeline.clone()),
        };
        return ClientEvent::Status(StatusEvent {
            time,
            status,
            target_type,
            target,
        });
    }

    ClientEvent::Log(LogEvent {
        time,
        src: record.source.clone(),
        level: record.level,
        msg: record.message.clone(),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn unit_status_line_targets_the_unit() {
        let rec = LogRecord::from_channel("root.myppl.myunit", Level::Info, "STATUS: 2");
        let ev = translate(&rec);
        let status = ev.as_status().expect("status event");
        assert_eq!(status.status, StatusCode::Running);
        assert_eq!(status.target_type, TargetType::Unit);
        assert_eq!(status.target, "myunit");
        assert_eq!(ev.pipeline(), None);
    }

    #[test]
    fn pipeline_status_line_targets_the_pipeline() {
        let rec = LogRecord::from_channel("root.myppl", Level::Info, "STATUS: 2");
        let ev = translate(&rec);
        let status = ev.as_status().expect("status event");
        assert_eq!(status.target_type, TargetType::Pipeline);
        assert_eq!(status.target, "myppl");
        assert_eq!(ev.pipeline(), Some("myppl"));
    }

    #[test]
    fn free_text_becomes_a_log_event() {
        let rec = LogRecord::from_channel("root.myppl.myunit", Level::Info, "computing...");
        let ev = translate(&rec);
        let log = ev.as_log().expect("log event");
        assert_eq!(log.src.pipeline.as_deref(), Some("myppl"));
        assert_eq!(log.src.unit.as_deref(), Some("myunit"));
        assert_eq!(log.msg, "computing...");
    }

    #[test]
    fn status_line_without_pipeline_stays_a_log() {
        let rec = LogRecord::from_channel("root", Level::Info, "STATUS: 3");
        let ev = translate(&rec);
        assert_eq!(ev.as_log().map(|l| l.msg.as_str()), Some("STATUS: 3"));
    }

    #[test]
    fn serializes_to_client_schema() {
        let ev = ClientEvent::Status(StatusEvent {
            time: 1.5,
            status: StatusCode::Failed,
            target_type: TargetType::Pipeline,
            target: "calc".into(),
        });
        assert_eq!(
            serde_json::to_value(&ev).unwrap(),
            json!({
                "type": "status",
                "content": {"time": 1.5, "status": 3, "target_type": "pipeline", "target": "calc"}
            })
        );

        let ev = ClientEvent::Log(LogEvent {
            time: 2.0,
            src: Source::unit("calc", "add"),
            level: Level::Error,
            msg: "boom".into(),
        });
        assert_eq!(
            serde_json::to_value(&ev).unwrap(),
            json!({
                "type": "log",
                "content": {
                    "time": 2.0,
                    "src": {"unit": "add", "pipeline": "calc"},
                    "level": "error",
                    "msg": "boom"
                }
            })
        );
    }
}
