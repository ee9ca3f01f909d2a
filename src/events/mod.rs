//! Runtime events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] typed publishing over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Dispatcher`, `DisplayWorker`, `WorkerPool`, `AlarmService`.
//! - **Consumers**: `AlarmService::event_listener()` fans out to the `SubscriberSet`
//!   (which includes the `WorkerTracker`).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
