//! # LogWriter: simple event printer
//!
//! A minimal client that prints incoming [`ClientEvent`]s to stdout.
//! Use it for test or demo.
//!
//! ## Example output
//! ```text
//! [status] pipeline="calc" status=running
//! [log] backend.calc level=info msg="Starting..."
//! [status] unit="add" status=finished
//! [log] backend.calc.add level=info msg="result=5"
//! [log] backend.calc level=error msg="Interrupted by user"
//! ```

use std::io;

use async_trait::async_trait;

use crate::clients::Client;
use crate::events::{ClientEvent, TargetType};

/// Event writer client.
pub struct LogWriter {
    root: String,
}

impl LogWriter {
    /// Construct a new [`LogWriter`] rendering channels under `root`.
    #[must_use]
    pub fn new(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }
}

impl Default for LogWriter {
    fn default() -> Self {
        Self::new("backend")
    }
}

#[async_trait]
impl Client for LogWriter {
    fn id(&self) -> &str {
        "LogWriter"
    }

    async fn send(&self, e: &ClientEvent) -> io::Result<()> {
        match e {
            ClientEvent::Status(ev) => {
                let kind = match ev.target_type {
                    TargetType::Unit => "unit",
                    TargetType::Pipeline => "pipeline",
                };
                println!("[status] {kind}={:?} status={}", ev.target, ev.status);
            }
            ClientEvent::Log(ev) => {
                println!(
                    "[log] {} level={} msg={:?}",
                    ev.src.channel(&self.root),
                    ev.level,
                    ev.msg
                );
            }
        }
        Ok(())
    }
}
