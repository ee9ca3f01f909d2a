//! # DisplayWorker: one slot of the display pool.
//!
//! A worker owns the partition of message numbers that
//! [`partition::owner`](crate::alarms::partition::owner) maps to its slot. It
//! sleeps until the earliest due alarm (or a wake from the dispatcher), prints
//! what is due, and exits once its partition is empty.
//!
//! ## State machine
//! ```text
//!          ┌──────────────────────────────────────────────┐
//!          ▼                                              │
//!        Idle ──table.cycle()──► Displaying(notices, next)│
//!                                   │            │        │
//!                          next=Wait(t)      next=Exit    │
//!                                   ▼            ▼        │
//!                              Waiting(t)     Exiting ──► "Display thread exiting ..." (terminal)
//!                                   │
//!                   wake | deadline ┴──────────────────────┘
//!                   token cancelled ─► detach, WorkerStopped (terminal, silent)
//! ```
//!
//! ## Rules
//! - All table access happens inside `AlarmTable::cycle` (one critical section per pass)
//! - Console output happens after the lock is released
//! - Within one worker, displays are strictly ordered by due time

use std::sync::Arc;

use tokio::select;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::alarms::{AlarmTable, Next, Notice, NoticeKind, RequestKind, WorkerId};
use crate::console::{Console, unix_seconds};
use crate::events::{Bus, EventKind};

/// Why a worker ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// Its partition became empty.
    Drained,
    /// The runtime was shutting down.
    Cancelled,
}

enum WorkerState {
    /// Awake; the next step reads the table.
    Idle,
    Waiting(Instant),
    Displaying(Vec<Notice>, Next),
    Exiting,
}

/// Long-lived display loop for one worker slot.
pub struct DisplayWorker {
    id: WorkerId,
    table: Arc<AlarmTable>,
    console: Arc<dyn Console>,
    bus: Bus,
}

impl DisplayWorker {
    pub fn new(
        id: WorkerId,
        table: Arc<AlarmTable>,
        console: Arc<dyn Console>,
        bus: Bus,
    ) -> Self {
        Self {
            id,
            table,
            console,
            bus,
        }
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// Runs until the partition is empty or `token` is cancelled.
    pub async fn run(self, token: CancellationToken) -> WorkerExit {
        let waker = self.table.waker(self.id);
        self.bus.worker(EventKind::WorkerStarted, self.id);

        let mut state = WorkerState::Idle;
        loop {
            state = match state {
                WorkerState::Idle => {
                    if token.is_cancelled() {
                        return self.stop();
                    }
                    let cycle = self.table.cycle(self.id, Instant::now());
                    WorkerState::Displaying(cycle.notices, cycle.next)
                }
                WorkerState::Displaying(notices, next) => {
                    let at = unix_seconds();
                    for notice in &notices {
                        self.display(notice, at);
                    }
                    match next {
                        Next::Wait(deadline) => WorkerState::Waiting(deadline),
                        Next::Exit => WorkerState::Exiting,
                    }
                }
                WorkerState::Waiting(deadline) => {
                    select! {
                        biased;
                        _ = token.cancelled() => return self.stop(),
                        _ = waker.notified() => {}
                        _ = time::sleep_until(deadline) => {}
                    }
                    WorkerState::Idle
                }
                WorkerState::Exiting => {
                    self.console.emit(&format!(
                        "Display thread exiting at time {}: thread {}",
                        unix_seconds(),
                        self.id
                    ));
                    self.bus.worker(EventKind::WorkerExiting, self.id);
                    return WorkerExit::Drained;
                }
            };
        }
    }

    /// Leaves the slot because of runtime cancellation.
    fn stop(&self) -> WorkerExit {
        let at = unix_seconds();
        for notice in self.table.detach(self.id) {
            self.display(&notice, at);
        }
        self.bus.worker(EventKind::WorkerStopped, self.id);
        WorkerExit::Cancelled
    }

    fn display(&self, notice: &Notice, at: u64) {
        self.console.emit(&render(self.id, notice, at));
        if notice.kind == NoticeKind::Due {
            self.bus.displayed(self.id, &notice.request);
        }
    }
}

pub(super) fn render(worker: WorkerId, notice: &Notice, at: u64) -> String {
    let r = &notice.request;
    match (notice.kind, r.kind) {
        (NoticeKind::Due, RequestKind::First) => format!(
            "Display thread {worker}: Received Alarm With Message Number {} at {at}: {} {}",
            r.number, r.schedule, r.message
        ),
        (NoticeKind::Due, RequestKind::Replacement) => format!(
            "Display thread {worker}: Received Replacement Alarm With Message Number {} at {at}: {} {}",
            r.number, r.schedule, r.message
        ),
        (NoticeKind::Replaced, _) => format!(
            "Display thread {worker}: Alarm With Message Number {} Replaced at {at}: {} {}",
            r.number, r.schedule, r.message
        ),
        (NoticeKind::Cancelled, _) => format!(
            "Display thread {worker}: Cancelled Alarm With Message Number {} at {at}",
            r.number
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarms::{AlarmRequest, MessageNumber, Schedule};
    use crate::console::BufferConsole;
    use std::time::Duration;
    use tokio::task::JoinHandle;

    struct Fixture {
        table: Arc<AlarmTable>,
        console: Arc<BufferConsole>,
        token: CancellationToken,
    }

    impl Fixture {
        fn new(workers: usize) -> Self {
            Self {
                table: Arc::new(AlarmTable::new(workers)),
                console: Arc::new(BufferConsole::new()),
                token: CancellationToken::new(),
            }
        }

        fn upsert(&self, number: u32, schedule: Schedule, msg: &str) -> bool {
            let request = AlarmRequest::new(
                MessageNumber::new(number).unwrap(),
                RequestKind::First,
                schedule,
                msg,
            );
            let due = Instant::now() + schedule.first_delay();
            self.table.upsert(request, due).spawn
        }

        fn spawn(&self, worker: usize) -> JoinHandle<WorkerExit> {
            let console: Arc<dyn Console> = self.console.clone();
            let worker = DisplayWorker::new(
                WorkerId::from_index(worker),
                Arc::clone(&self.table),
                console,
                Bus::new(16),
            );
            tokio::spawn(worker.run(self.token.clone()))
        }
    }

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_shot_is_displayed_then_worker_exits() {
        let fx = Fixture::new(1);
        assert!(fx.upsert(1, Schedule::Once { after: secs(5) }, "hello"));
        let handle = fx.spawn(0);

        time::sleep(secs(4)).await;
        assert!(!fx.console.contains("Received Alarm"), "displayed too early");

        time::sleep(secs(2)).await;
        assert_eq!(handle.await.unwrap(), WorkerExit::Drained);

        let lines = fx.console.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with(
            "Display thread 1: Received Alarm With Message Number 1 at "
        ));
        assert!(lines[0].ends_with(": in=5s hello"));
        assert!(lines[1].starts_with("Display thread exiting at time "));
        assert!(fx.table.running_workers().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_request_is_never_displayed() {
        let fx = Fixture::new(1);
        fx.upsert(1, Schedule::Once { after: secs(5) }, "hello");
        let handle = fx.spawn(0);
        time::sleep(Duration::from_millis(10)).await;

        fx.table
            .cancel(MessageNumber::new(1).unwrap())
            .await
            .unwrap();
        time::sleep(secs(10)).await;

        assert_eq!(handle.await.unwrap(), WorkerExit::Drained);
        assert!(!fx.console.contains("Received"));
        assert!(fx.console.contains("Cancelled Alarm With Message Number 1"));
        assert!(fx.console.contains("Display thread exiting at time"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_repeats_until_runtime_cancel() {
        let fx = Fixture::new(1);
        fx.upsert(1, Schedule::Every { period: secs(1) }, "tick");
        let handle = fx.spawn(0);

        time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(fx.console.count("Received Alarm With Message Number 1"), 3);

        fx.token.cancel();
        assert_eq!(handle.await.unwrap(), WorkerExit::Cancelled);
        assert!(!fx.console.contains("exiting"), "runtime stop is silent");
        assert!(fx.table.running_workers().is_empty());
        assert_eq!(fx.table.len(), 1, "live requests survive a runtime stop");
    }

    #[tokio::test(start_paused = true)]
    async fn test_replacement_wakes_worker() {
        let fx = Fixture::new(1);
        fx.upsert(1, Schedule::Once { after: secs(60) }, "old");
        let handle = fx.spawn(0);
        time::sleep(Duration::from_millis(10)).await;

        assert!(!fx.upsert(1, Schedule::Once { after: secs(1) }, "new"));
        time::sleep(Duration::from_millis(10)).await;
        assert!(fx.console.contains("Alarm With Message Number 1 Replaced at"));

        time::sleep(secs(2)).await;
        assert_eq!(handle.await.unwrap(), WorkerExit::Drained);
        assert!(fx.console.contains(
            "Received Replacement Alarm With Message Number 1 at"
        ));
        assert!(!fx.console.contains("old"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_worker_ignores_other_partitions() {
        let fx = Fixture::new(2);
        fx.upsert(1, Schedule::Once { after: secs(1) }, "mine");
        fx.upsert(2, Schedule::Once { after: secs(1) }, "theirs");
        let handle = fx.spawn(0);

        time::sleep(secs(2)).await;
        assert_eq!(handle.await.unwrap(), WorkerExit::Drained);
        assert!(fx.console.contains("mine"));
        assert!(!fx.console.contains("theirs"));
        assert!(fx.table.contains(MessageNumber::new(2).unwrap()));
    }
}
