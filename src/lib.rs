//! # alarmvisor
//!
//! **Alarmvisor** is a concurrent alarm scheduler. A serial dispatcher reads
//! line commands that start, replace or cancel numbered alarms; a fixed-size
//! pool of display workers prints each alarm when it comes due.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!            stdin / any AsyncBufRead
//!                       │ lines
//!                       ▼
//!              ┌─────────────────┐   one acknowledgement per line
//!              │   Dispatcher    │ ─────────────────────────────────► Console
//!              │  (parse_line)   │
//!              └───┬─────────┬───┘
//!     upsert/cancel│         │ spawn(owner) when the slot is vacant
//!                  ▼         ▼
//! ┌───────────────────┐   ┌──────────────────────────────────────────┐
//! │    AlarmTable     │   │ WorkerPool (TaskTracker, runtime token)  │
//! │ Mutex<entries>    │   └──────┬──────────────┬──────────────┬─────┘
//! │ Notify per slot   │◄──cycle──┤              │              │
//! └───────────────────┘     ┌────┴─────┐   ┌────┴─────┐   ┌────┴─────┐
//!                           │ Display  │   │ Display  │   │ Display  │
//!                           │ worker 1 │   │ worker 2 │   │ worker N │ ──► Console
//!                           └──────────┘   └──────────┘   └──────────┘
//!
//!  every component ── publish(Event) ──► Bus ──► event listener ──► SubscriberSet
//!                                                                 ├─► WorkerTracker
//!                                                                 ├─► LogWriter (feature "logging")
//!                                                                 └─► custom Subscribe impls
//! ```
//!
//! ### Partitioning
//! Message number `n` is owned by worker slot `(n - 1) % workers` for the whole
//! run. A slot's worker is started by the first request it owns and exits
//! (printing `Display thread exiting at time <t>: thread <id>`) once its
//! partition is empty; a later request restarts it.
//!
//! ### Command protocol
//! ```text
//! Start_Alarm: <n> [in=<dur> | every=<dur>] <message>
//! Replace_Alarm: <n> [in=<dur> | every=<dur>] <message>
//! Cancel_Alarm: <n>
//! ```
//!
//! ## Features
//! | Area              | Description                                          | Key types / traits                      |
//! |-------------------|------------------------------------------------------|-----------------------------------------|
//! | **Service**       | Runs dispatcher and workers, graceful shutdown.      | [`AlarmService`]                        |
//! | **Commands**      | Parse command lines.                                 | [`parse_line`], [`Command`]             |
//! | **Alarm table**   | Shared store, partitioning, cancel handshake.        | [`AlarmTable`], [`WorkerId`]            |
//! | **Subscriber API**| Hook into runtime events.                            | [`Subscribe`], [`Event`], [`EventKind`] |
//! | **Errors**        | Typed errors with their protocol lines.              | [`CommandError`], [`AlarmError`], [`RuntimeError`] |
//! | **Configuration** | Centralize runtime settings.                         | [`Config`]                              |
//!
//! ## Optional features
//! - `logging` (default): exports the built-in [`LogWriter`] subscriber.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use alarmvisor::{AlarmService, BufferConsole, Config};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config { workers: 2, ..Config::default() };
//!     let console = Arc::new(BufferConsole::new());
//!
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn alarmvisor::Subscribe>> = vec![Arc::new(alarmvisor::LogWriter::new())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn alarmvisor::Subscribe>> = Vec::new();
//!
//!     let service = AlarmService::new(cfg, console.clone(), subs);
//!     let input: &[u8] = b"Start_Alarm: 1 in=1h wake up\nBogus\n";
//!     service.run_until(input, std::future::pending()).await?;
//!
//!     assert_eq!(
//!         console.lines(),
//!         vec!["First Alarm Request With Message Number 1", "Bad command"],
//!     );
//!     Ok(())
//! }
//! ```
pub mod alarms;
mod command;
mod config;
mod console;
mod core;
mod error;
mod events;
mod subscribers;

// ---- Public re-exports ----

pub use alarms::{
    AlarmRequest, AlarmTable, MessageNumber, Notice, NoticeKind, RequestKind, Schedule,
    UpsertOutcome, WorkerId,
};
pub use command::{Command, MAX_DELAY, MAX_MESSAGE_LEN, Verb, parse_line};
pub use config::Config;
pub use console::{BufferConsole, Console, StdoutConsole};
pub use crate::core::{
    AlarmService, Dispatcher, DisplayWorker, ShutdownSignal, WorkerExit, WorkerPool,
};
pub use error::{AlarmError, CommandError, RuntimeError};
pub use events::{Bus, Event, EventKind};
pub use subscribers::{Subscribe, SubscriberSet, WorkerTracker};

// Optional: expose a simple built-in logger subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
