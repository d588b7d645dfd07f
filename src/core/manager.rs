//! # Pipeline manager: registry plus process lifecycle.
//!
//! [`PipelineManager`] maps pipeline names to their definitions, live processes and bus
//! attachments. Each run happens in a forked child; the parent only tracks the pid and the
//! shared status cell.
//!
//! ## Architecture
//! ```text
//! start_pipeline(name)
//!   ├─► registry lookup              (NotFound)
//!   ├─► first start: attach          bus.add_pipeline + RunStatus(hook → on_status_changed)
//!   ├─► live process?                (AlreadyRunning; dead handles are reaped)
//!   ├─► rebind hook                  (to the pipeline registered now)
//!   ├─► status = RUNNING             (parent writes, parent announces; blocking pool)
//!   └─► fork ──► child: worker::run_pipeline → _exit
//!
//! stop_pipeline(name)
//!   ├─► SIGKILL + reap               (NotFound / NotRunning; blocking pool)
//!   ├─► status = FAILED, "Interrupted by user"
//!   └─► detach                       bus.remove_pipeline; last status kept
//! ```
//!
//! ## Rules
//! - At most one live process per name.
//! - A [`RunStatus`] exists iff the pipeline is attached to the bus.
//! - Registering a name twice replaces the earlier pipeline; its next run uses the new
//!   pipeline's status hook.
//! - Queue sends and `waitpid` never run on a runtime worker thread.

use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::core::process::{ProcessHandle, describe_exit};
use crate::core::worker;
use crate::error::{RuntimeError, Target};
use crate::events::EventBus;
use crate::pipelines::{PipelineLogger, PipelineRef};
use crate::status::{RunStatus, StatusCode, StatusHook};

/// Forwards status writes to the pipeline's own hook.
struct PipelineHook {
    pipeline: PipelineRef,
    logger: PipelineLogger,
}

impl StatusHook for PipelineHook {
    fn on_status_changed(&self, status: StatusCode) {
        self.pipeline.on_status_changed(status, &self.logger);
    }
}

/// Bus wiring of a started pipeline.
struct Attachment {
    status: RunStatus,
    logger: PipelineLogger,
}

#[derive(Default)]
struct Registry {
    pipelines: HashMap<String, PipelineRef>,
    processes: HashMap<String, ProcessHandle>,
    attached: HashMap<String, Attachment>,
    /// Status observed when the pipeline was detached.
    last_status: HashMap<String, StatusCode>,
}

impl Registry {
    fn pipeline(&self, name: &str) -> Result<PipelineRef, RuntimeError> {
        self.pipelines
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::not_found(Target::Pipeline(name.to_string())))
    }

    /// True if `name` has a live process; a dead one is reaped and dropped.
    fn reap(&mut self, name: &str) -> bool {
        let Some(handle) = self.processes.get_mut(name) else {
            return false;
        };
        if handle.is_alive() {
            return true;
        }
        if let Some(handle) = self.processes.remove(name) {
            tracing::debug!(
                pipeline = %name,
                pid = handle.pid(),
                exit = %handle.exit_status().map(describe_exit).unwrap_or_default(),
                "pipeline process reaped"
            );
        }
        false
    }
}

/// Registry and lifecycle controller for pipelines.
pub struct PipelineManager {
    bus: Arc<EventBus>,
    inner: Mutex<Registry>,
}

impl PipelineManager {
    /// Creates an empty manager publishing through `bus`.
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            bus,
            inner: Mutex::new(Registry::default()),
        }
    }

    /// Event bus the manager attaches pipelines to.
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Registers `pipeline` under its name and returns the pipeline it replaced, if any.
    pub async fn add_pipeline(&self, pipeline: PipelineRef) -> Option<PipelineRef> {
        let name = pipeline.name().to_string();
        let previous = self.inner.lock().await.pipelines.insert(name.clone(), pipeline);
        if previous.is_some() {
            tracing::warn!(pipeline = %name, "pipeline registered twice; replacing");
        }
        previous
    }

    /// Returns the registered pipeline.
    pub async fn get_pipeline(&self, name: &str) -> Result<PipelineRef, RuntimeError> {
        self.inner.lock().await.pipeline(name)
    }

    /// Registered names, sorted.
    pub async fn pipelines(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.lock().await.pipelines.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Starts a run of `name` in a new process.
    ///
    /// The first start attaches the pipeline to the bus, which must be running at that point.
    pub async fn start_pipeline(&self, name: &str) -> Result<(), RuntimeError> {
        let mut reg = self.inner.lock().await;
        let pipeline = reg.pipeline(name)?;

        if !reg.attached.contains_key(name) {
            let attachment = self.attach(&pipeline)?;
            reg.attached.insert(name.to_string(), attachment);
            reg.last_status.remove(name);
        }
        if reg.reap(name) {
            return Err(RuntimeError::already_running(Target::Pipeline(
                name.to_string(),
            )));
        }

        let Some(attachment) = reg.attached.get_mut(name) else {
            return Err(RuntimeError::not_found(Target::Pipeline(name.to_string())));
        };
        // The registration may have been replaced since the previous run.
        attachment.status = attachment.status.with_hook(Arc::new(PipelineHook {
            pipeline: Arc::clone(&pipeline),
            logger: attachment.logger.clone(),
        }));
        let status = attachment.status.clone();
        let logger = attachment.logger.clone();

        let spawned = tokio::task::spawn_blocking(move || launch(pipeline, status, logger))
            .await
            .unwrap_or_else(|e| Err(io::Error::other(e)));
        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!(pipeline = %name, error = %e, "fork failed");
                return Err(RuntimeError::Spawn(e));
            }
        };

        tracing::info!(pipeline = %name, pid = handle.pid(), "pipeline started");
        reg.processes.insert(name.to_string(), handle);
        Ok(())
    }

    /// Kills the running process of `name`, marks the run failed and detaches it.
    pub async fn stop_pipeline(&self, name: &str) -> Result<(), RuntimeError> {
        let mut reg = self.inner.lock().await;
        reg.pipeline(name)?;
        self.stop_locked(&mut reg, name).await
    }

    /// Current status; `None` if the pipeline was never started.
    pub async fn status(&self, name: &str) -> Result<Option<StatusCode>, RuntimeError> {
        let reg = self.inner.lock().await;
        reg.pipeline(name)?;
        Ok(match reg.attached.get(name) {
            Some(attachment) => Some(attachment.status.get()),
            None => reg.last_status.get(name).copied(),
        })
    }

    /// True while `name` has a live process.
    pub async fn is_running(&self, name: &str) -> Result<bool, RuntimeError> {
        let mut reg = self.inner.lock().await;
        reg.pipeline(name)?;
        Ok(reg.reap(name))
    }

    /// Names with a live process, sorted.
    pub async fn running(&self) -> Vec<String> {
        let mut reg = self.inner.lock().await;
        let names: Vec<String> = reg.processes.keys().cloned().collect();
        let mut live: Vec<String> = names.into_iter().filter(|n| reg.reap(n)).collect();
        live.sort_unstable();
        live
    }

    /// Stops every live pipeline; returns the names that were stopped.
    pub async fn shutdown(&self) -> Vec<String> {
        let mut reg = self.inner.lock().await;
        let mut names: Vec<String> = reg.processes.keys().cloned().collect();
        names.sort_unstable();

        let mut stopped = Vec::with_capacity(names.len());
        for name in names {
            match self.stop_locked(&mut reg, &name).await {
                Ok(()) => stopped.push(name),
                Err(RuntimeError::NotRunning { .. }) => {}
                Err(e) => tracing::warn!(pipeline = %name, error = %e, "stop during shutdown failed"),
            }
        }
        stopped
    }

    fn attach(&self, pipeline: &PipelineRef) -> Result<Attachment, RuntimeError> {
        let name = pipeline.name();
        let logger = self.bus.add_pipeline(name)?;
        match RunStatus::new() {
            Ok(status) => {
                tracing::debug!(pipeline = %name, "pipeline attached");
                Ok(Attachment { status, logger })
            }
            Err(e) => {
                let _ = self.bus.remove_pipeline(name);
                Err(RuntimeError::Spawn(e))
            }
        }
    }

    async fn stop_locked(&self, reg: &mut Registry, name: &str) -> Result<(), RuntimeError> {
        if !reg.reap(name) {
            return Err(RuntimeError::not_running(Target::Pipeline(name.to_string())));
        }
        let Some(mut handle) = reg.processes.remove(name) else {
            return Err(RuntimeError::not_running(Target::Pipeline(name.to_string())));
        };
        let pid = handle.pid();
        let attachment = reg.attached.remove(name);
        let announce = attachment
            .as_ref()
            .map(|a| (a.status.clone(), a.logger.clone()));

        let stopped = tokio::task::spawn_blocking(move || {
            let killed = handle.kill();
            if let Some((status, logger)) = announce {
                status.set(StatusCode::Failed);
                logger.error("Interrupted by user");
            }
            killed
        })
        .await;
        match stopped {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(pipeline = %name, pid, error = %e, "kill failed"),
            Err(e) => tracing::error!(pipeline = %name, pid, error = %e, "stop task failed"),
        }

        if let Some(attachment) = attachment {
            reg.last_status.insert(name.to_string(), attachment.status.get());
            if let Err(e) = self.bus.remove_pipeline(name) {
                tracing::warn!(pipeline = %name, error = %e, "detach failed");
            }
        }
        tracing::info!(pipeline = %name, pid, "pipeline interrupted");
        Ok(())
    }
}

/// Writes RUNNING and forks the run. Blocks on the queue, so it runs off the runtime threads.
fn launch(
    pipeline: PipelineRef,
    status: RunStatus,
    logger: PipelineLogger,
) -> io::Result<ProcessHandle> {
    status.set(StatusCode::Running);
    let spawned = {
        let status = status.clone();
        let logger = logger.clone();
        ProcessHandle::spawn(move || worker::run_pipeline(pipeline.as_ref(), &status, &logger))
    };
    if let Err(e) = &spawned {
        status.set(StatusCode::Failed);
        logger.error(format!("failed to start: {e}"));
    }
    spawned
}
