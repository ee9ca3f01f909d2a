//! # Worker pool: spawns display workers on demand and tracks their tasks.
//!
//! The table decides *when* a slot needs a worker (`Upserted::spawn`); the pool
//! only starts it and keeps a watcher for it inside a [`TaskTracker`].
//!
//! ```text
//! spawn(id) ─► tokio::spawn(worker.run(child token)) ─► JoinHandle
//!                                                          │ watcher (tracked)
//!                        Ok(exit) ◄────────────────────────┤
//!                        Err(panic) ─► table.recover(id) ──┴─► WorkerPanicked
//!                                          │ respawn && token live
//!                                          └──────────────► spawn(id) again
//! ```
//!
//! ## Rules
//! - Every worker runs under a child of the pool's runtime token
//! - A panicked worker's slot is recovered in one table critical section: it is
//!   released when its partition is empty, otherwise a replacement is started
//! - `close()` + `wait()` joins every worker ever spawned (including respawns)

use std::sync::Arc;

use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::alarms::{AlarmTable, Recovered, WorkerId};
use crate::console::{Console, unix_seconds};
use crate::core::worker::{DisplayWorker, render};
use crate::events::Bus;

struct Shared {
    table: Arc<AlarmTable>,
    console: Arc<dyn Console>,
    bus: Bus,
    token: CancellationToken,
    tracker: TaskTracker,
}

/// Spawner and join point for display workers.
pub struct WorkerPool {
    shared: Arc<Shared>,
}

impl WorkerPool {
    pub fn new(
        table: Arc<AlarmTable>,
        console: Arc<dyn Console>,
        bus: Bus,
        token: CancellationToken,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                table,
                console,
                bus,
                token,
                tracker: TaskTracker::new(),
            }),
        }
    }

    /// Starts the worker for slot `id`.
    ///
    /// Callers only do this when the table reported the slot as vacant.
    pub fn spawn(&self, id: WorkerId) {
        launch(&self.shared, id);
    }

    /// No more waits will be started; `wait()` completes once all workers are done.
    pub fn close(&self) {
        self.shared.tracker.close();
    }

    /// Waits for every spawned worker. Only completes after [`close`](Self::close).
    pub async fn wait(&self) {
        self.shared.tracker.wait().await;
    }

    /// Number of workers still running.
    pub fn active(&self) -> usize {
        self.shared.tracker.len()
    }
}

fn launch(shared: &Arc<Shared>, id: WorkerId) {
    let worker = DisplayWorker::new(
        id,
        Arc::clone(&shared.table),
        Arc::clone(&shared.console),
        shared.bus.clone(),
    );
    let join = tokio::spawn(worker.run(shared.token.child_token()));

    let watcher = Arc::clone(shared);
    shared.tracker.spawn(async move {
        if let Err(err) = join.await {
            crashed(&watcher, id, err);
        }
    });
}

/// Cleans up after a worker task that did not return.
fn crashed(shared: &Arc<Shared>, id: WorkerId, err: JoinError) {
    let Recovered { notices, respawn } = if shared.token.is_cancelled() {
        Recovered {
            notices: shared.table.detach(id),
            respawn: false,
        }
    } else {
        shared.table.recover(id)
    };

    let at = unix_seconds();
    for notice in &notices {
        shared.console.emit(&render(id, notice, at));
    }

    if err.is_panic() {
        shared.bus.worker_panicked(id, err.to_string());
    }
    if respawn {
        tracing::warn!(worker = %id, "restarting display worker after panic");
        launch(shared, id);
    }
}
