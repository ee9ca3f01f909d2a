//! # Event bus: typed publishing of alarm runtime events.
//!
//! Producers never build [`Event`]s by hand; they call the method naming what
//! happened (`upserted`, `displayed`, `worker`, ...) and the bus fills in the
//! kind and the metadata that kind carries. Events travel as `Arc<Event>` over a
//! [`tokio::sync::broadcast`] channel, so fan-out never clones the payload.
//!
//! ## Architecture
//! ```text
//! Dispatcher ── command_rejected / upserted / cancelled / cancel_rejected ──┐
//! Worker N   ── worker(Started|Exiting|Stopped) / displayed ────────────────┤
//! WorkerPool ── worker_panicked ────────────────────────────────────────────┼─► broadcast<Arc<Event>>
//! Service    ── phase(InputClosed|ShutdownRequested|...) / grace_exceeded ──┘          │
//!                                                                                       ▼
//!                                                                 event listener ─► SubscriberSet
//! ```
//!
//! ## Rules
//! - Publishing never blocks and never fails; with no receiver the event is dropped
//! - Slow receivers observe `RecvError::Lagged(n)` and skip the `n` oldest events

use std::sync::Arc;

use tokio::sync::broadcast;

use super::event::{Event, EventKind};
use crate::alarms::{AlarmRequest, MessageNumber, UpsertOutcome, Upserted, WorkerId};
use crate::error::{AlarmError, CommandError};

/// Broadcast channel for runtime events. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Arc<Event>>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publishes a pre-built event.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(Arc::new(ev));
    }

    /// Creates a receiver for events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Event>> {
        self.tx.subscribe()
    }

    /// A command line failed validation.
    pub fn command_rejected(&self, err: &CommandError) {
        self.publish(
            Event::new(EventKind::CommandRejected)
                .with_reason(format!("{}: {}", err.as_label(), err.as_message())),
        );
    }

    /// The table stored a request.
    pub fn upserted(&self, number: MessageNumber, upserted: &Upserted) {
        let kind = match upserted.outcome {
            UpsertOutcome::Created => EventKind::AlarmCreated,
            UpsertOutcome::Replaced => EventKind::AlarmReplaced,
        };
        self.publish(
            Event::new(kind)
                .with_number(number)
                .with_worker(upserted.owner),
        );
    }

    /// A cancel completed and the request is gone.
    pub fn cancelled(&self, number: MessageNumber, owner: WorkerId) {
        self.publish(
            Event::new(EventKind::AlarmCancelled)
                .with_number(number)
                .with_worker(owner),
        );
    }

    pub fn cancel_rejected(&self, err: &AlarmError) {
        self.publish(
            Event::new(EventKind::CancelRejected)
                .with_number(err.number())
                .with_reason(err.as_label()),
        );
    }

    /// Lifecycle change of a display worker (`WorkerStarted`, `WorkerExiting`, `WorkerStopped`).
    pub fn worker(&self, kind: EventKind, worker: WorkerId) {
        debug_assert!(kind.is_worker_lifecycle(), "{kind:?} is not a worker event");
        self.publish(Event::new(kind).with_worker(worker));
    }

    pub fn worker_panicked(&self, worker: WorkerId, info: impl Into<Arc<str>>) {
        self.publish(
            Event::new(EventKind::WorkerPanicked)
                .with_worker(worker)
                .with_reason(info),
        );
    }

    /// A worker printed a due request.
    pub fn displayed(&self, worker: WorkerId, request: &AlarmRequest) {
        self.publish(
            Event::new(EventKind::AlarmDisplayed)
                .with_worker(worker)
                .with_number(request.number)
                .with_reason(request.message.as_str()),
        );
    }

    /// Service-wide progress without metadata (`InputClosed`, `ShutdownRequested`, `AllStoppedWithin`).
    pub fn phase(&self, kind: EventKind) {
        debug_assert!(kind.is_phase(), "{kind:?} is not a service phase");
        self.publish(Event::new(kind));
    }

    /// Shutdown timed out with `stuck` workers still running.
    pub fn grace_exceeded(&self, stuck: &[WorkerId]) {
        let stuck: Vec<String> = stuck.iter().map(ToString::to_string).collect();
        self.publish(
            Event::new(EventKind::GraceExceeded).with_reason(format!("stuck=[{}]", stuck.join(","))),
        );
    }
}
