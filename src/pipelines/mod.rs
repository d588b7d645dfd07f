//! # Pipeline abstractions.
//!
//! This module provides the pipeline-facing types:
//! - [`Pipeline`] - trait implemented by the dataflow engine
//! - [`PipelineFn`] - closure-backed pipeline
//! - [`PipelineRef`] - shared reference to a pipeline (`Arc<dyn Pipeline>`)
//! - [`RunContext`] - what `run` receives
//! - [`PipelineLogger`] - hierarchical log channel of a pipeline or unit

mod logger;
mod pipeline;

pub use logger::PipelineLogger;
pub use pipeline::{Pipeline, PipelineFn, PipelineRef, RunContext};
