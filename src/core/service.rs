//! # AlarmService: wires the dispatcher, the display pool, event delivery and shutdown.
//!
//! The [`AlarmService`] owns the alarm table, the event bus, a [`SubscriberSet`]
//! and the runtime configuration. [`run`](AlarmService::run) reads commands
//! until end of input or an OS signal, then stops the display workers within
//! [`Config::grace`].
//!
//! ## High-level architecture
//! ```text
//! run(input) ─► run_until(input, ShutdownSignal::recv())
//!
//! Preparation:
//!   - event_listener(): Bus.subscribe() ─► SubscriberSet::emit(&Arc<Event>)   (fire-and-forget)
//!   - runtime CancellationToken, WorkerPool, Dispatcher
//!
//! Main phase (whichever completes first):
//!   Dispatcher::run(input)  ── lines ─► AlarmTable ─► WorkerPool::spawn(owner) on demand
//!   shutdown future         ── signal
//!
//! End of input:
//!   Bus.phase(InputClosed)
//!   linger=true  ─► pool.wait() until every worker drained (a signal still interrupts)
//!   linger=false ─► shutdown path
//!
//! Shutdown path:
//!   Bus.phase(ShutdownRequested)
//!   runtime_token.cancel()   → every worker leaves its wait and stops silently
//!   wait_all_with_grace(cfg.grace):
//!      ├─ Ok (all joined)    → Bus.phase(AllStoppedWithin)
//!      └─ Timeout exceeded   → Bus.grace_exceeded(stuck)
//!                              (WorkerTracker.snapshot() for stuck workers)
//! ```
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use alarmvisor::{AlarmService, BufferConsole, Config};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let console = Arc::new(BufferConsole::new());
//!     let service = AlarmService::new(Config::default(), console.clone(), Vec::new());
//!
//!     let input: &[u8] = b"Start_Alarm: 1 in=60s tea\nCancel_Alarm: 1\n";
//!     service.run_until(input, std::future::pending()).await?;
//!
//!     assert!(console.contains("Cancel Alarm Request With Message Number 1"));
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::AsyncBufRead;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use crate::alarms::AlarmTable;
use crate::config::Config;
use crate::console::Console;
use crate::core::dispatcher::Dispatcher;
use crate::core::pool::WorkerPool;
use crate::core::shutdown::ShutdownSignal;
use crate::error::RuntimeError;
use crate::events::{Bus, EventKind};
use crate::subscribers::{Subscribe, SubscriberSet, WorkerTracker};

/// Runs the alarm dispatcher and its display workers.
pub struct AlarmService {
    cfg: Config,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    tracker: Arc<WorkerTracker>,
    table: Arc<AlarmTable>,
    console: Arc<dyn Console>,
    listening: AtomicBool,
}

impl AlarmService {
    /// Creates a service writing protocol lines to `console`.
    ///
    /// A [`WorkerTracker`] is always added to `subscribers`.
    /// Must be called from within a tokio runtime.
    pub fn new(
        cfg: Config,
        console: Arc<dyn Console>,
        mut subscribers: Vec<Arc<dyn Subscribe>>,
    ) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let tracker = Arc::new(WorkerTracker::new());
        subscribers.push(tracker.clone());

        Self {
            table: Arc::new(AlarmTable::new(cfg.worker_count())),
            subs: Arc::new(SubscriberSet::new(subscribers)),
            cfg,
            bus,
            tracker,
            console,
            listening: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// The shared alarm table (for inspection).
    pub fn table(&self) -> &Arc<AlarmTable> {
        &self.table
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Reads commands from `input` until end of input or an OS termination signal.
    pub async fn run<R>(&self, input: R) -> Result<(), RuntimeError>
    where
        R: AsyncBufRead + Unpin,
    {
        let signal = ShutdownSignal::install().map_err(RuntimeError::Signal)?;
        self.run_until(input, signal.recv()).await
    }

    /// Like [`run`](Self::run), with `shutdown` standing in for the OS signal.
    pub async fn run_until<R, S>(&self, input: R, shutdown: S) -> Result<(), RuntimeError>
    where
        R: AsyncBufRead + Unpin,
        S: Future<Output = ()>,
    {
        self.event_listener();

        let token = CancellationToken::new();
        let pool = Arc::new(WorkerPool::new(
            Arc::clone(&self.table),
            Arc::clone(&self.console),
            self.bus.clone(),
            token.clone(),
        ));
        let dispatcher = Dispatcher::new(
            Arc::clone(&self.table),
            Arc::clone(&pool),
            Arc::clone(&self.console),
            self.bus.clone(),
            &self.cfg,
        );

        tokio::pin!(shutdown);
        let input_result = tokio::select! {
            _ = &mut shutdown => None,
            res = dispatcher.run(input) => Some(res),
        };
        pool.close();

        if let Some(res) = &input_result {
            self.bus.phase(EventKind::InputClosed);
            if res.is_ok() && self.cfg.linger {
                tokio::select! {
                    _ = pool.wait() => {
                        self.bus.phase(EventKind::AllStoppedWithin);
                        return Ok(());
                    }
                    _ = &mut shutdown => {}
                }
            }
        }

        self.bus.phase(EventKind::ShutdownRequested);
        token.cancel();
        let stopped = self.wait_all_with_grace(&pool).await;

        match input_result {
            Some(Err(e)) => Err(e),
            _ => stopped,
        }
    }

    /// Subscribes to the bus and forwards events to the subscriber set. Spawned once.
    fn event_listener(&self) {
        if self.listening.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut rx = self.bus.subscribe();
        let set = Arc::clone(&self.subs);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => set.emit(&ev),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "event listener lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }

    /// Waits for all workers to stop within the configured grace period.
    ///
    /// Publishes [`EventKind::AllStoppedWithin`] on success, or
    /// [`EventKind::GraceExceeded`] on timeout and returns
    /// [`RuntimeError::GraceExceeded`] with the workers still alive.
    async fn wait_all_with_grace(&self, pool: &WorkerPool) -> Result<(), RuntimeError> {
        let grace = self.cfg.grace;
        match tokio::time::timeout(grace, pool.wait()).await {
            Ok(()) => {
                self.bus.phase(EventKind::AllStoppedWithin);
                Ok(())
            }
            Err(_) => {
                let stuck = self.tracker.snapshot().await;
                self.bus.grace_exceeded(&stuck);
                Err(RuntimeError::GraceExceeded { grace, stuck })
            }
        }
    }
}
