//! # Event subscribers for the alarmvisor runtime.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out
//! and the built-in implementations.
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   Dispatcher / Worker ── publish(Event) ──► Bus ──► event listener ──► SubscriberSet
//!                                                                           │
//!                                                        ┌──────────────────┼──────────┐
//!                                                        ▼                  ▼          ▼
//!                                                   WorkerTracker       LogWriter    Custom
//! ```
//!
//! ## Subscriber types
//! - **Passive subscribers** - observe and react to events (logging, metrics)
//! - **Stateful subscribers** - maintain internal state based on events (WorkerTracker)

#[cfg(feature = "logging")]
mod embedded;
mod set;
mod subscribe;
mod tracker;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
pub use tracker::WorkerTracker;
