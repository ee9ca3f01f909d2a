//! Alarm data model and the shared alarm table.
//!
//! ## Contents
//! - [`AlarmRequest`], [`MessageNumber`], [`Schedule`], [`RequestKind`]: request values
//! - [`partition::owner`], [`WorkerId`]: stable assignment of numbers to display workers
//! - [`AlarmTable`]: the single shared store, its wake signals and cancel handshake

pub mod partition;
mod request;
mod table;

pub use partition::WorkerId;
pub use request::{AlarmRequest, MessageNumber, RequestKind, Schedule};
pub(crate) use table::deadline_after;
pub use table::{AlarmTable, Cycle, Next, Notice, NoticeKind, PendingCancel, Recovered, UpsertOutcome, Upserted};
