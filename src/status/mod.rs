//! Run status: codes, line protocol and the cross-process cell.
//!
//! ## Contents
//! - [`StatusCode`] three-valued status, its `STATUS: <code>` line encoding and validation
//! - [`RunStatus`] status cell shared with a pipeline's process, with a [`StatusHook`]

mod cell;
mod code;
mod run_status;

pub use code::StatusCode;
pub use run_status::{NoopHook, RunStatus, StatusHook};
