//! # Status codes and their line protocol.
//!
//! Status transitions share the log channel with free-form messages. A transition is a
//! log line of the exact form `STATUS: <code>`:
//!
//! ```text
//! STATUS: 1   → finished
//! STATUS: 2   → running
//! STATUS: 3   → failed
//! ```
//!
//! ## Rules
//! - Decoding is anchored: no leading/trailing characters, not even a newline.
//! - Any log message equal to an encoded line **is** a status transition. Producers must
//!   never emit free text of that exact form.
//! - Values outside `{1, 2, 3}` are rejected, never clamped.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StatusError;

/// Keyword prefix of an encoded status line.
const KEYWORD: &str = "STATUS";

/// Run status of a pipeline (or of a unit inside it).
///
/// Serialized as its integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum StatusCode {
    /// Not running; the last run completed normally (also the initial value).
    Finished = 1,
    /// A run is in progress.
    Running = 2,
    /// The last run raised an error or was interrupted.
    Failed = 3,
}

impl StatusCode {
    /// Returns the integer code.
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Checks that `raw` is a valid status code.
    ///
    /// # Example
    /// ```
    /// use pipevisor::StatusCode;
    ///
    /// assert_eq!(StatusCode::validate(2).unwrap(), StatusCode::Running);
    /// assert!(StatusCode::validate(0).is_err());
    /// assert!(StatusCode::validate(-1).is_err());
    /// ```
    pub fn validate(raw: i64) -> Result<Self, StatusError> {
        match raw {
            1 => Ok(StatusCode::Finished),
            2 => Ok(StatusCode::Running),
            3 => Ok(StatusCode::Failed),
            _ => Err(StatusError::invalid(raw)),
        }
    }

    /// Produces the status line for this code.
    ///
    /// ```
    /// use pipevisor::StatusCode;
    ///
    /// assert_eq!(StatusCode::Failed.encode(), "STATUS: 3");
    /// ```
    pub fn encode(self) -> String {
        format!("{KEYWORD}: {}", self.code())
    }

    /// Parses a status line; `None` for anything that is not exactly an encoded line.
    ///
    /// ```
    /// use pipevisor::StatusCode;
    ///
    /// assert_eq!(StatusCode::decode("STATUS: 2"), Some(StatusCode::Running));
    /// assert_eq!(StatusCode::decode("STATUS: 2\n"), None);
    /// assert_eq!(StatusCode::decode("computing..."), None);
    /// ```
    pub fn decode(line: &str) -> Option<Self> {
        let rest = line.strip_prefix(KEYWORD)?.strip_prefix(": ")?;
        match rest {
            "1" => Some(StatusCode::Finished),
            "2" => Some(StatusCode::Running),
            "3" => Some(StatusCode::Failed),
            _ => None,
        }
    }

    /// Returns a short lowercase name for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            StatusCode::Finished => "finished",
            StatusCode::Running => "running",
            StatusCode::Failed => "failed",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<StatusCode> for u8 {
    fn from(code: StatusCode) -> Self {
        code.code()
    }
}

impl TryFrom<u8> for StatusCode {
    type Error = StatusError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        StatusCode::validate(i64::from(raw))
    }
}

impl TryFrom<i64> for StatusCode {
    type Error = StatusError;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        StatusCode::validate(raw)
    }
}

/// Parses the textual form of an integer code (`"2"`); non-integers are rejected.
impl FromStr for StatusCode {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: i64 = s.trim().parse().map_err(|_| StatusError::invalid(s))?;
        StatusCode::validate(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [StatusCode; 3] = [StatusCode::Finished, StatusCode::Running, StatusCode::Failed];

    #[test]
    fn decode_inverts_encode() {
        for code in ALL {
            assert_eq!(StatusCode::decode(&code.encode()), Some(code));
        }
    }

    #[test]
    fn decode_rejects_near_misses() {
        for line in [
            "",
            "STATUS:",
            "STATUS: ",
            "STATUS: 0",
            "STATUS: 4",
            "STATUS: 22",
            "STATUS:2",
            "STATUS:  2",
            "status: 2",
            " STATUS: 2",
            "STATUS: 2 ",
            "STATUS: 2\n",
            "xSTATUS: 2",
            "STATUS: running",
            "computing...",
        ] {
            assert_eq!(StatusCode::decode(line), None, "line {line:?}");
        }
    }

    #[test]
    fn validate_accepts_only_known_codes() {
        assert_eq!(StatusCode::validate(1), Ok(StatusCode::Finished));
        assert_eq!(StatusCode::validate(2), Ok(StatusCode::Running));
        assert_eq!(StatusCode::validate(3), Ok(StatusCode::Failed));
        for raw in [0, 4, -1, i64::MAX, i64::MIN] {
            assert!(StatusCode::validate(raw).is_err(), "raw {raw}");
        }
    }

    #[test]
    fn parse_rejects_non_integers() {
        assert_eq!("2".parse::<StatusCode>(), Ok(StatusCode::Running));
        for text in ["2.0", "2.5", "abc", "", "RUNNING", "0x2"] {
            let err = text.parse::<StatusCode>().unwrap_err();
            assert_eq!(err.as_label(), "status_invalid", "text {text:?}");
        }
    }

    #[test]
    fn serializes_as_integer() {
        assert_eq!(serde_json::to_string(&StatusCode::Running).unwrap(), "2");
        assert_eq!(
            serde_json::from_str::<StatusCode>("3").unwrap(),
            StatusCode::Failed
        );
        assert!(serde_json::from_str::<StatusCode>("4").is_err());
    }
}
