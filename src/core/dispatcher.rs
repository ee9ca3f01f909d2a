//! # Dispatcher: reads command lines and applies them to the alarm table.
//!
//! One line in, exactly one acknowledgement out. Blank lines are skipped
//! without a response.
//!
//! ```text
//! input line ──► parse_line ──┬─ Start/Replace ──► table.upsert ──► (spawn owner?) ──► "First…" / "Replacement…"
//!                             ├─ Cancel ─────────► table.cancel (waits for owner) ─► "Cancel…" / "Error: …"
//!                             └─ Err ─────────────────────────────────────────────► "Error: Incorrect format" / "Bad command"
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::time::Instant;

use crate::alarms::{AlarmRequest, AlarmTable, MessageNumber, UpsertOutcome, deadline_after};
use crate::command::{Command, parse_line};
use crate::config::Config;
use crate::console::Console;
use crate::core::pool::WorkerPool;
use crate::error::RuntimeError;
use crate::events::Bus;

/// Serial command reader feeding the shared table.
pub struct Dispatcher {
    table: Arc<AlarmTable>,
    pool: Arc<WorkerPool>,
    console: Arc<dyn Console>,
    bus: Bus,
    default_delay: Duration,
    prompt: Option<String>,
}

impl Dispatcher {
    pub fn new(
        table: Arc<AlarmTable>,
        pool: Arc<WorkerPool>,
        console: Arc<dyn Console>,
        bus: Bus,
        cfg: &Config,
    ) -> Self {
        Self {
            table,
            pool,
            console,
            bus,
            default_delay: cfg.default_delay,
            prompt: cfg.prompt.clone(),
        }
    }

    /// Processes lines until end of input.
    ///
    /// Returns [`RuntimeError::Input`] if reading fails.
    pub async fn run<R>(&self, input: R) -> Result<(), RuntimeError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        loop {
            if let Some(prompt) = &self.prompt {
                self.console.prompt(prompt);
            }
            let Some(line) = lines.next_line().await.map_err(RuntimeError::Input)? else {
                return Ok(());
            };
            if line.trim().is_empty() {
                continue;
            }
            let response = self.handle_line(&line).await;
            self.console.emit(&response);
        }
    }

    /// Applies one command line and returns its acknowledgement.
    pub async fn handle_line(&self, line: &str) -> String {
        match parse_line(line, self.default_delay) {
            Ok(Command::Start(request) | Command::Replace(request)) => self.upsert(request),
            Ok(Command::Cancel(number)) => self.cancel(number).await,
            Err(err) => {
                self.bus.command_rejected(&err);
                err.response()
            }
        }
    }

    fn upsert(&self, request: AlarmRequest) -> String {
        let number = request.number;
        let due = deadline_after(Instant::now(), request.schedule.first_delay());
        let upserted = self.table.upsert(request, due);
        if upserted.spawn {
            self.pool.spawn(upserted.owner);
        }

        self.bus.upserted(number, &upserted);
        match upserted.outcome {
            UpsertOutcome::Created => format!("First Alarm Request With Message Number {number}"),
            UpsertOutcome::Replaced => {
                format!("Replacement Alarm Request With Message Number {number}")
            }
        }
    }

    async fn cancel(&self, number: MessageNumber) -> String {
        match self.table.cancel(number).await {
            Ok(()) => {
                self.bus.cancelled(number, self.table.owner(number));
                format!("Cancel Alarm Request With Message Number {number}")
            }
            Err(err) => {
                self.bus.cancel_rejected(&err);
                err.response()
            }
        }
    }
}
