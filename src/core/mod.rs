//! Runtime core: command dispatch, display workers and lifecycle.
//!
//! The public entry point is [`AlarmService`]; the building blocks are exported
//! for embedding and tests.
//!
//! Internal modules:
//! - [`dispatcher`]: reads command lines and applies them to the alarm table;
//! - [`worker`]: one display loop per worker slot;
//! - [`pool`]: spawns workers on demand and joins them at shutdown;
//! - [`shutdown`]: cross-platform shutdown signal handling;
//! - [`service`]: wires everything together and enforces the grace period.

mod dispatcher;
mod pool;
mod service;
mod shutdown;
mod worker;

pub use dispatcher::Dispatcher;
pub use pool::WorkerPool;
pub use service::AlarmService;
pub use shutdown::ShutdownSignal;
pub use worker::{DisplayWorker, WorkerExit};
