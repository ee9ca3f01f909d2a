//! # Built-in subscribers
//!
//! - [`LogWriter`]: forwards events to `tracing` (feature `logging`).

mod log;

pub use log::LogWriter;
