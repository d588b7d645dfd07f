//! Runtime core: configuration and pipeline lifecycle.
//!
//! The public API from this module is [`PipelineManager`] and [`Config`].
//!
//! Internal modules:
//! - [`manager`]: registry of pipelines, start/stop lifecycle, bus attachment;
//! - [`process`]: fork, liveness polling and termination of pipeline processes;
//! - [`worker`]: the wrapper a pipeline process runs.

mod config;
mod manager;
mod process;
mod worker;

pub use config::Config;
pub use manager::PipelineManager;
