//! # SubscriberSet: filtered, non-blocking delivery of alarm events
//!
//! Every subscriber is a *lane*: its [`Subscribe`] impl, a bounded queue sized
//! by [`Subscribe::queue_capacity`], a task draining that queue and a counter
//! of events it lost to a full queue.
//!
//! ```text
//!   emit(Arc<Event>)
//!        │  accepts(kind)?      try_send
//!        ├── WorkerTracker ── yes ──► [queue] ─► task ─► on_event()
//!        ├── LogWriter     ── yes ──► [queue] ─► task ─► on_event()
//!        └── custom        ── no ───► (skipped, not counted)
//! ```
//!
//! ## Rules
//! - `emit` never awaits; per-lane order is publication order
//! - A full or closed queue drops the event for that lane only, bumps its
//!   `dropped` counter and logs a warning
//! - A panicking `on_event` is caught and logged; the lane keeps running

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

use crate::events::Event;

use super::Subscribe;

struct Lane {
    sub: Arc<dyn Subscribe>,
    sender: mpsc::Sender<Arc<Event>>,
    dropped: AtomicU64,
}

/// Fan-out of bus events to the registered subscribers.
pub struct SubscriberSet {
    lanes: Vec<Lane>,
    tasks: Vec<JoinHandle<()>>,
}

impl SubscriberSet {
    /// Creates one lane per subscriber. Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>) -> Self {
        let mut lanes = Vec::with_capacity(subs.len());
        let mut tasks = Vec::with_capacity(subs.len());

        for sub in subs {
            let (sender, rx) = mpsc::channel(sub.queue_capacity().max(1));
            tasks.push(tokio::spawn(drain(Arc::clone(&sub), rx)));
            lanes.push(Lane {
                sub,
                sender,
                dropped: AtomicU64::new(0),
            });
        }

        Self { lanes, tasks }
    }

    /// Queues `event` for every subscriber that accepts its kind.
    pub fn emit(&self, event: &Arc<Event>) {
        for lane in &self.lanes {
            if !lane.sub.accepts(event.kind) {
                continue;
            }
            let reason = match lane.sender.try_send(Arc::clone(event)) {
                Ok(()) => continue,
                Err(TrySendError::Full(_)) => "queue full",
                Err(TrySendError::Closed(_)) => "queue closed",
            };
            let dropped = lane.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::warn!(
                subscriber = lane.sub.name(),
                seq = event.seq,
                kind = ?event.kind,
                reason,
                dropped,
                "subscriber dropped event"
            );
        }
    }

    /// Events lost by the subscriber called `name` (`None` if there is no such subscriber).
    #[must_use]
    pub fn dropped(&self, name: &str) -> Option<u64> {
        self.lanes
            .iter()
            .find(|lane| lane.sub.name() == name)
            .map(|lane| lane.dropped.load(Ordering::Relaxed))
    }

    /// Closes every queue and waits until the lanes have handled what was queued.
    pub async fn shutdown(self) {
        drop(self.lanes);
        for task in self.tasks {
            let _ = task.await;
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lanes.len()
    }
}

async fn drain(sub: Arc<dyn Subscribe>, mut rx: mpsc::Receiver<Arc<Event>>) {
    while let Some(ev) = rx.recv().await {
        let handled = std::panic::AssertUnwindSafe(sub.on_event(&ev))
            .catch_unwind()
            .await;
        if let Err(panic) = handled {
            tracing::error!(
                subscriber = sub.name(),
                seq = ev.seq,
                kind = ?ev.kind,
                panic = panic_message(panic.as_ref()),
                "subscriber panicked"
            );
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarms::WorkerId;
    use crate::events::EventKind;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    fn event(kind: EventKind) -> Arc<Event> {
        Arc::new(Event::new(kind))
    }

    #[derive(Default)]
    struct Counter(AtomicUsize);

    #[async_trait]
    impl Subscribe for Counter {
        async fn on_event(&self, _ev: &Event) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Panicky;

    #[async_trait]
    impl Subscribe for Panicky {
        async fn on_event(&self, _ev: &Event) {
            panic!("boom");
        }
    }

    /// Only wants displays and never drains faster than one event at a time.
    struct Displays {
        seen: AtomicUsize,
        gate: tokio::sync::Semaphore,
    }

    #[async_trait]
    impl Subscribe for Displays {
        async fn on_event(&self, _ev: &Event) {
            let _permit = self.gate.acquire().await;
            self.seen.fetch_add(1, Ordering::SeqCst);
        }

        fn accepts(&self, kind: EventKind) -> bool {
            kind == EventKind::AlarmDisplayed
        }

        fn name(&self) -> &'static str {
            "displays"
        }

        fn queue_capacity(&self) -> usize {
            1
        }
    }

    #[tokio::test]
    async fn test_fan_out_survives_panicking_subscriber() {
        let counter = Arc::new(Counter::default());
        let set = SubscriberSet::new(vec![Arc::new(Panicky), counter.clone()]);
        assert_eq!(set.len(), 2);

        set.emit(&event(EventKind::InputClosed));
        set.emit(&event(EventKind::InputClosed));
        set.shutdown().await;

        assert_eq!(counter.0.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_filtered_kinds_are_skipped_and_overflow_is_counted() {
        let displays = Arc::new(Displays {
            seen: AtomicUsize::new(0),
            gate: tokio::sync::Semaphore::new(0),
        });
        let set = SubscriberSet::new(vec![displays.clone()]);
        let shown = || {
            Arc::new(
                Event::new(EventKind::AlarmDisplayed).with_worker(WorkerId::from_index(0)),
            )
        };

        // Not accepted: never queued, never counted.
        for _ in 0..5 {
            set.emit(&event(EventKind::WorkerStarted));
        }
        assert_eq!(set.dropped("displays"), Some(0));

        // The lane task takes the first event and blocks on the gate, the
        // second fills the one-slot queue, the rest are dropped.
        set.emit(&shown());
        tokio::task::yield_now().await;
        set.emit(&shown());
        set.emit(&shown());
        set.emit(&shown());
        assert_eq!(set.dropped("displays"), Some(2));
        assert_eq!(set.dropped("missing"), None);

        displays.gate.add_permits(8);
        set.shutdown().await;
        assert_eq!(displays.seen.load(Ordering::SeqCst), 2);
    }
}
