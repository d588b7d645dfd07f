//! # Log records, client events and the bus that connects them.
//!
//! - [`LogRecord`] is what producers submit (pipelines, units, the manager).
//! - [`ClientEvent`] is what clients receive, produced by [`translate`].
//! - [`EventBus`] runs the queue and the consumer in between.

mod bus;
mod event;
mod record;
mod route;

pub use bus::EventBus;
pub use event::{ClientEvent, LogEvent, StatusEvent, TargetType, translate};
pub use record::{Level, LogRecord, Source};
pub(crate) use route::LogRoute;
