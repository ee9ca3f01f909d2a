//! # LogWriter: events to `tracing`
//!
//! A subscriber that turns incoming [`Event`]s into `tracing` records. Protocol
//! output (acknowledgements and displays) goes through the console, never here.
//!
//! ## Levels
//! - `debug`: accepted commands, displays, worker start/exit
//! - `info`: end of input, shutdown progress
//! - `warn`: rejected commands, grace exceeded, worker panics

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let number = e.number.map(|n| n.get());
        let worker = e.worker.map(|w| w.index() + 1);
        let reason = e.reason.as_deref();

        match e.kind {
            EventKind::CommandRejected => {
                tracing::warn!(seq = e.seq, reason, "command rejected");
            }
            EventKind::AlarmCreated => {
                tracing::debug!(seq = e.seq, number, worker, "alarm created");
            }
            EventKind::AlarmReplaced => {
                tracing::debug!(seq = e.seq, number, worker, "alarm replaced");
            }
            EventKind::AlarmCancelled => {
                tracing::debug!(seq = e.seq, number, worker, "alarm cancelled");
            }
            EventKind::CancelRejected => {
                tracing::warn!(seq = e.seq, number, reason, "cancel rejected");
            }
            EventKind::WorkerStarted => {
                tracing::debug!(seq = e.seq, worker, "display worker started");
            }
            EventKind::AlarmDisplayed => {
                tracing::debug!(seq = e.seq, number, worker, "alarm displayed");
            }
            EventKind::WorkerExiting => {
                tracing::debug!(seq = e.seq, worker, "display worker exiting");
            }
            EventKind::WorkerStopped => {
                tracing::debug!(seq = e.seq, worker, "display worker stopped");
            }
            EventKind::WorkerPanicked => {
                tracing::error!(seq = e.seq, worker, reason, "display worker panicked");
            }
            EventKind::InputClosed => {
                tracing::info!(seq = e.seq, "end of command input");
            }
            EventKind::ShutdownRequested => {
                tracing::info!(seq = e.seq, "shutdown requested");
            }
            EventKind::AllStoppedWithin => {
                tracing::info!(seq = e.seq, "all display workers stopped within grace");
            }
            EventKind::GraceExceeded => {
                tracing::warn!(seq = e.seq, reason, "grace period exceeded");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
