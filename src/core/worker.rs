//! # Child-side run wrapper.
//!
//! Executed inside the forked pipeline process. Produces the fixed record sequence clients
//! rely on:
//!
//! ```text
//! success: "Starting..." → <pipeline records> → "...done" → STATUS: 1
//! error:   "Starting..." → <pipeline records> → STATUS: 3 → <error diagnostic>
//! panic:   "Starting..." → <pipeline records> → STATUS: 3 → <panic message>
//! ```
//!
//! `RUNNING` is written by the parent before the fork, so it precedes all of the above.
//! Nothing here may touch `tracing` or parent-side locks.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::pipelines::{Pipeline, PipelineLogger, RunContext};
use crate::status::{RunStatus, StatusCode};

/// Runs `pipeline` once and records the outcome in `status`.
pub(crate) fn run_pipeline(pipeline: &dyn Pipeline, status: &RunStatus, logger: &PipelineLogger) {
    logger.info("Starting...");
    let ctx = RunContext::new(logger.clone());

    match panic::catch_unwind(AssertUnwindSafe(|| pipeline.run(&ctx))) {
        Ok(Ok(())) => {
            logger.info("...done");
            status.set(StatusCode::Finished);
        }
        Ok(Err(err)) => {
            status.set(StatusCode::Failed);
            logger.error(format!("{err:?}"));
        }
        Err(payload) => {
            status.set(StatusCode::Failed);
            logger.error(format!("pipeline panicked: {}", panic_message(payload.as_ref())));
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}
