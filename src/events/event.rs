//! # Runtime events emitted by the dispatcher, display workers and the service.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Command events**: what the dispatcher did with an input line
//! - **Worker events**: display worker lifecycle and displays
//! - **Shutdown events**: end of input, signals, grace handling
//!
//! Trouble inside subscribers themselves is logged by the
//! [`SubscriberSet`](crate::SubscriberSet), not fed back into the bus.
//!
//! The [`Event`] struct carries additional metadata such as timestamps, message
//! number, worker id and a free-form reason.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use alarmvisor::{Event, EventKind, MessageNumber, WorkerId};
//!
//! let ev = Event::new(EventKind::AlarmDisplayed)
//!     .with_number(MessageNumber::new(3).unwrap())
//!     .with_worker(WorkerId::from_index(0))
//!     .with_reason("hello");
//!
//! assert_eq!(ev.kind, EventKind::AlarmDisplayed);
//! assert_eq!(ev.number.map(|n| n.get()), Some(3));
//! assert_eq!(ev.reason.as_deref(), Some("hello"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::alarms::{MessageNumber, WorkerId};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(1);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Command events ===
    /// A line failed validation.
    ///
    /// Sets:
    /// - `reason`: error label and details
    CommandRejected,

    /// A request was inserted under a new message number.
    ///
    /// Sets:
    /// - `number`, `worker` (owner)
    AlarmCreated,

    /// An existing request was overwritten.
    ///
    /// Sets:
    /// - `number`, `worker` (owner)
    AlarmReplaced,

    /// A cancel completed; the request is gone from the table.
    ///
    /// Sets:
    /// - `number`, `worker` (owner)
    AlarmCancelled,

    /// A cancel was rejected (no such request, or duplicate).
    ///
    /// Sets:
    /// - `number`
    /// - `reason`: error label
    CancelRejected,

    // === Worker events ===
    /// A display worker started for its slot.
    ///
    /// Sets:
    /// - `worker`
    WorkerStarted,

    /// A worker displayed a due request.
    ///
    /// Sets:
    /// - `number`, `worker`
    /// - `reason`: the message text
    AlarmDisplayed,

    /// A worker found its partition empty and exited.
    ///
    /// Sets:
    /// - `worker`
    WorkerExiting,

    /// A worker was stopped by runtime cancellation.
    ///
    /// Sets:
    /// - `worker`
    WorkerStopped,

    /// A worker task panicked.
    ///
    /// Sets:
    /// - `worker`
    /// - `reason`: panic info
    WorkerPanicked,

    // === Shutdown events ===
    /// The command stream reached end of input.
    InputClosed,

    /// Shutdown requested (OS signal or end of input).
    ShutdownRequested,

    /// All workers stopped within the configured grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some workers did not stop in time.
    ///
    /// Sets:
    /// - `reason`: `stuck=[..]` with the workers still running
    GraceExceeded,
}

impl EventKind {
    /// Start or end of a display worker.
    #[inline]
    pub fn is_worker_lifecycle(self) -> bool {
        matches!(self, EventKind::WorkerStarted) || self.is_worker_terminal()
    }

    /// End of a display worker, whatever the cause.
    #[inline]
    pub fn is_worker_terminal(self) -> bool {
        matches!(
            self,
            EventKind::WorkerExiting | EventKind::WorkerStopped | EventKind::WorkerPanicked
        )
    }

    /// Service progress events that carry no metadata.
    #[inline]
    pub fn is_phase(self) -> bool {
        matches!(
            self,
            EventKind::InputClosed | EventKind::ShutdownRequested | EventKind::AllStoppedWithin
        )
    }
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Message number, if applicable.
    pub number: Option<MessageNumber>,
    /// Display worker, if applicable.
    pub worker: Option<WorkerId>,
    /// Human-readable reason (error labels, alarm messages, panic info).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            number: None,
            worker: None,
            reason: None,
        }
    }

    /// Attaches a message number.
    #[inline]
    pub fn with_number(mut self, number: MessageNumber) -> Self {
        self.number = Some(number);
        self
    }

    /// Attaches a worker id.
    #[inline]
    pub fn with_worker(mut self, worker: WorkerId) -> Self {
        self.worker = Some(worker);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[inline]
    pub fn is_worker_terminal(&self) -> bool {
        self.kind.is_worker_terminal()
    }
}
