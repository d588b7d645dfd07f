//! # Pipeline contract.
//!
//! A [`Pipeline`] has a stable [`name`](Pipeline::name) and a synchronous
//! [`run`](Pipeline::run) executed inside its own forked process. The dataflow engine that
//! implements it stays opaque to this crate.
//!
//! Status changes reach clients through [`Pipeline::on_status_changed`]; the default
//! announces the new status on the pipeline's channel as a `STATUS: <code>` line.

use std::borrow::Cow;
use std::sync::Arc;

use crate::pipelines::logger::PipelineLogger;
use crate::status::StatusCode;

/// Shared handle to a pipeline.
pub type PipelineRef = Arc<dyn Pipeline>;

/// What a pipeline sees while running.
#[derive(Clone, Debug)]
pub struct RunContext {
    logger: PipelineLogger,
}

impl RunContext {
    pub(crate) fn new(logger: PipelineLogger) -> Self {
        Self { logger }
    }

    /// Pipeline-level log channel.
    pub fn logger(&self) -> &PipelineLogger {
        &self.logger
    }

    /// Log channel of a unit inside the pipeline.
    pub fn unit(&self, unit: &str) -> PipelineLogger {
        self.logger.unit(unit)
    }
}

/// # A named unit of work run in an isolated process.
///
/// `run` executes in a freshly forked child of the manager's process. Return an error (or
/// panic) to mark the run as failed; the full diagnostic is forwarded to clients.
///
/// # Example
/// ```
/// use pipevisor::{Pipeline, RunContext};
///
/// struct Sum;
///
/// impl Pipeline for Sum {
///     fn name(&self) -> &str { "sum" }
///
///     fn run(&self, ctx: &RunContext) -> anyhow::Result<()> {
///         let add = ctx.unit("add");
///         add.info(format!("result={}", 2 + 3));
///         Ok(())
///     }
/// }
/// ```
pub trait Pipeline: Send + Sync + 'static {
    /// Returns the registry name; also the second segment of the log channel.
    fn name(&self) -> &str;

    /// Performs the work. Runs in the pipeline's own process; may block indefinitely.
    ///
    /// # Fork safety
    /// The process is forked from a multi-threaded parent and only the forking thread
    /// survives. Locks another parent thread held at that moment stay locked forever in the
    /// child. That covers `std::io::stdout`/`stderr`, a `tracing` subscriber, and any
    /// `Mutex` shared with the manager's side. Report through the [`RunContext`] loggers and
    /// create any other synchronized state inside `run`; the parent's Tokio runtime is not
    /// usable here.
    fn run(&self, ctx: &RunContext) -> anyhow::Result<()>;

    /// Invoked after every status write, in the process that wrote it.
    ///
    /// Must not take locks shared with the manager's process.
    fn on_status_changed(&self, status: StatusCode, logger: &PipelineLogger) {
        logger.status(status);
    }
}

/// Function-backed pipeline.
///
/// Wraps a closure invoked once per run.
#[derive(Debug)]
pub struct PipelineFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> PipelineFn<F>
where
    F: Fn(&RunContext) -> anyhow::Result<()> + Send + Sync + 'static,
{
    /// Creates a new function-backed pipeline.
    ///
    /// Prefer [`PipelineFn::arc`] when you immediately need a [`PipelineRef`].
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self { name: name.into(), f }
    }

    /// Creates the pipeline and returns it as a shared handle.
    ///
    /// ## Example
    /// ```rust
    /// use pipevisor::{PipelineFn, PipelineRef, RunContext};
    ///
    /// let p: PipelineRef = PipelineFn::arc("hello", |ctx: &RunContext| {
    ///     ctx.logger().info("hello");
    ///     Ok(())
    /// });
    /// assert_eq!(p.name(), "hello");
    /// ```
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

impl<F> Pipeline for PipelineFn<F>
where
    F: Fn(&RunContext) -> anyhow::Result<()> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, ctx: &RunContext) -> anyhow::Result<()> {
        (self.f)(ctx)
    }
}
