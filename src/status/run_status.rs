//! # Cross-process status cell with a change hook.
//!
//! [`RunStatus`] is the status capability attached to a pipeline. The value lives in a
//! [`SharedCell`], so the parent and the pipeline's forked process read and write the
//! same word. Every successful write invokes the cell's [`StatusHook`] **in the writing
//! process**.
//!
//! ```text
//!   parent                          child (forked)
//!   ──────                          ──────────────
//!   RunStatus ─┐                ┌─ RunStatus (same cell, child-side hook)
//!              └──► SharedCell ◄┘
//!                   AtomicU32 in a MAP_SHARED page
//! ```
//!
//! ## Rules
//! - Initial value is [`StatusCode::Finished`].
//! - Writes are `SeqCst`; no locking is needed for one writer at a time.
//! - Rejected values never reach the cell and never invoke the hook.

use std::fmt;
use std::io;
use std::sync::Arc;

use crate::error::StatusError;
use crate::status::cell::SharedCell;
use crate::status::code::StatusCode;

/// Side effect attached to status writes.
///
/// Runs synchronously in the process that performed the write, which may be a forked
/// pipeline process. Implementations must not take locks shared with the parent.
pub trait StatusHook: Send + Sync + 'static {
    /// Called after the new value has been stored.
    fn on_status_changed(&self, status: StatusCode);
}

/// Hook that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHook;

impl StatusHook for NoopHook {
    fn on_status_changed(&self, _status: StatusCode) {}
}

impl<F> StatusHook for F
where
    F: Fn(StatusCode) + Send + Sync + 'static,
{
    fn on_status_changed(&self, status: StatusCode) {
        self(status)
    }
}

/// Status cell shared with a pipeline's process.
///
/// Cloning is cheap and yields another handle to the **same** cell and hook.
#[derive(Clone)]
pub struct RunStatus {
    cell: Arc<SharedCell>,
    hook: Arc<dyn StatusHook>,
}

impl RunStatus {
    /// Creates a cell at [`StatusCode::Finished`] with a no-op hook.
    pub fn new() -> io::Result<Self> {
        Self::with_status_hook(NoopHook)
    }

    /// Creates a cell at [`StatusCode::Finished`] with the given hook.
    pub fn with_status_hook(hook: impl StatusHook) -> io::Result<Self> {
        Ok(Self {
            cell: Arc::new(SharedCell::new(u32::from(StatusCode::Finished.code()))?),
            hook: Arc::new(hook),
        })
    }

    /// Returns another view of the same cell that reports writes to `hook` instead.
    #[must_use]
    pub fn with_hook(&self, hook: Arc<dyn StatusHook>) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
            hook,
        }
    }

    /// Returns the current status.
    pub fn get(&self) -> StatusCode {
        let raw = self.cell.load();
        // Only valid codes are ever stored.
        StatusCode::validate(i64::from(raw)).unwrap_or(StatusCode::Failed)
    }

    /// Stores `status` and invokes the hook.
    pub fn set(&self, status: StatusCode) {
        self.cell.store(u32::from(status.code()));
        self.hook.on_status_changed(status);
    }

    /// Validates a raw value, then behaves like [`set`](Self::set).
    pub fn set_raw(&self, raw: i64) -> Result<StatusCode, StatusError> {
        let status = StatusCode::validate(raw)?;
        self.set(status);
        Ok(status)
    }

    /// Stores `new` only if the cell still holds `current`.
    ///
    /// Returns the observed value on mismatch; the hook fires only on success.
    pub fn compare_and_set(&self, current: StatusCode, new: StatusCode) -> Result<(), StatusCode> {
        match self
            .cell
            .compare_exchange(u32::from(current.code()), u32::from(new.code()))
        {
            Ok(_) => {
                self.hook.on_status_changed(new);
                Ok(())
            }
            Err(observed) => {
                Err(StatusCode::validate(i64::from(observed)).unwrap_or(StatusCode::Failed))
            }
        }
    }
}

impl fmt::Debug for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunStatus")
            .field("status", &self.get())
            .finish_non_exhaustive()
    }
}
