//! # Display worker tracker with sequence-based ordering.
//!
//! Maintains which display workers are currently running, using event sequence
//! numbers to handle out-of-order delivery.
//!
//! ## Architecture
//! ```text
//! Workers ──► Bus ──► event listener ──► SubscriberSet ──► WorkerTracker::update()
//!                                                                  │
//!                                                                  ▼
//!                                                 HashMap<WorkerId, WorkerState>
//!                                                     (worker → {seq, alive})
//! ```
//!
//! ## Rules
//! - Only worker lifecycle events are queued for it (`Subscribe::accepts`)
//! - Read operations (`snapshot`, `is_alive`) are **eventually consistent**
//! - Events with `seq <= last_seq` are **rejected** (stale)

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::alarms::WorkerId;
use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

#[derive(Debug, Clone)]
struct WorkerState {
    last_seq: u64,
    alive: bool,
}

/// Thread-safe tracker of running display workers.
///
/// Supplies the list of stuck workers when shutdown exceeds its grace period.
pub struct WorkerTracker {
    state: RwLock<HashMap<WorkerId, WorkerState>>,
}

impl Default for WorkerTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkerTracker {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(HashMap::new()),
        }
    }

    /// Applies a worker event if it is newer than the last one seen for that worker.
    ///
    /// ```text
    /// update(WorkerExiting, seq=100)  → alive=false, last_seq=100
    /// update(WorkerStarted, seq=99)   → rejected (stale)
    /// ```
    ///
    /// Returns `true` if the alive state was updated.
    pub async fn update(&self, ev: &Event) -> bool {
        let Some(worker) = ev.worker else {
            return false;
        };

        let mut state = self.state.write().await;
        let entry = state.entry(worker).or_insert(WorkerState {
            last_seq: 0,
            alive: false,
        });
        if ev.seq <= entry.last_seq {
            return false;
        }
        entry.last_seq = ev.seq;

        match ev.kind {
            EventKind::WorkerStarted => {
                entry.alive = true;
                true
            }
            _ if ev.is_worker_terminal() => {
                entry.alive = false;
                true
            }
            _ => false,
        }
    }

    /// Sorted list of workers currently running.
    pub async fn snapshot(&self) -> Vec<WorkerId> {
        let state = self.state.read().await;
        let mut alive: Vec<WorkerId> = state
            .iter()
            .filter(|(_, ws)| ws.alive)
            .map(|(id, _)| *id)
            .collect();
        alive.sort_unstable();
        alive
    }

    pub async fn is_alive(&self, worker: WorkerId) -> bool {
        self.state
            .read()
            .await
            .get(&worker)
            .is_some_and(|ws| ws.alive)
    }
}

#[async_trait]
impl Subscribe for WorkerTracker {
    async fn on_event(&self, event: &Event) {
        self.update(event).await;
    }

    fn accepts(&self, kind: EventKind) -> bool {
        kind.is_worker_lifecycle()
    }

    fn name(&self) -> &'static str {
        "WorkerTracker"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worker_event(kind: EventKind, worker: usize) -> Event {
        Event::new(kind).with_worker(WorkerId::from_index(worker))
    }

    #[tokio::test]
    async fn test_start_and_exit() {
        let tracker = WorkerTracker::new();
        assert!(tracker.update(&worker_event(EventKind::WorkerStarted, 0)).await);
        assert!(tracker.update(&worker_event(EventKind::WorkerStarted, 2)).await);
        assert_eq!(
            tracker.snapshot().await,
            vec![WorkerId::from_index(0), WorkerId::from_index(2)]
        );

        assert!(tracker.update(&worker_event(EventKind::WorkerExiting, 0)).await);
        assert!(!tracker.is_alive(WorkerId::from_index(0)).await);
        assert!(tracker.is_alive(WorkerId::from_index(2)).await);
    }

    #[tokio::test]
    async fn test_stale_events_are_rejected() {
        let tracker = WorkerTracker::new();
        let started = worker_event(EventKind::WorkerStarted, 1);
        let stopped = worker_event(EventKind::WorkerStopped, 1);

        assert!(tracker.update(&stopped).await);
        assert!(!tracker.update(&started).await, "older seq must be ignored");
        assert!(!tracker.is_alive(WorkerId::from_index(1)).await);
    }

    #[test]
    fn test_accepts_only_worker_lifecycle() {
        let tracker = WorkerTracker::new();
        assert!(tracker.accepts(EventKind::WorkerStarted));
        assert!(tracker.accepts(EventKind::WorkerPanicked));
        assert!(!tracker.accepts(EventKind::AlarmDisplayed));
        assert!(!tracker.accepts(EventKind::GraceExceeded));
    }

    #[tokio::test]
    async fn test_events_without_worker_are_ignored() {
        let tracker = WorkerTracker::new();
        assert!(!tracker.update(&Event::new(EventKind::InputClosed)).await);
        assert!(tracker.snapshot().await.is_empty());
    }
}
