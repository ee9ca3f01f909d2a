//! # Alarm table: the single shared store of alarm requests.
//!
//! One mutex guards the entries and the per-slot "worker running" flags. Each
//! worker slot also has a [`Notify`] used as its wake signal; wakes are sent
//! while the lock is held, and because `notify_one` leaves a permit behind when
//! nobody is waiting, a wake can never fall between a worker's table read and
//! its next wait.
//!
//! ## Architecture
//! ```text
//! Dispatcher ──► upsert(request, due) ──┐
//!            ──► begin_cancel(number) ──┤       ┌──────────────────────────────┐
//!                                       ├─lock─►│ entries: number → Entry      │
//! Worker N   ──► cycle(N, now) ─────────┤       │ running: [bool; workers]     │
//!            ──► detach / recover(N) ───┘       └──────────────┬───────────────┘
//!                                                              │ notify_one (under lock)
//!                                                              ▼
//!                                                      wakers[owner(number)]
//! ```
//!
//! ## Cancel handshake
//! ```text
//! begin_cancel(n): live?    no ─► NoSuchAlarm
//!                  pending? yes ─► DuplicateCancel
//!                  mark pending, wake owner ─► PendingCancel
//! cycle(owner):    remove pending entries, ack each ─► PendingCancel::wait() returns
//! ```
//!
//! ## Rules
//! - The lock is never held across `.await` or console I/O
//! - A pending entry is invisible to display and to [`AlarmTable::snapshot_for`]
//! - A slot flips to "not running" only inside the critical section that finds
//!   its partition empty, so the next upsert for it reports `spawn = true`

use std::collections::BTreeMap;
use std::collections::btree_map::Entry as MapEntry;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{Notify, oneshot};
use tokio::time::Instant;

use super::partition::{self, WorkerId};
use super::{AlarmRequest, MessageNumber, RequestKind, Schedule};
use crate::error::AlarmError;

struct Entry {
    request: AlarmRequest,
    due: Instant,
    /// Replaced since its worker last looked.
    announce: bool,
    /// Set while a cancel is in flight.
    cancel: Option<oneshot::Sender<()>>,
}

struct Inner {
    entries: BTreeMap<MessageNumber, Entry>,
    running: Vec<bool>,
}

/// Result of [`AlarmTable::upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Replaced,
}

/// What an upsert did and what the caller has to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Upserted {
    pub outcome: UpsertOutcome,
    /// Worker owning the request.
    pub owner: WorkerId,
    /// The owning slot had no running worker; the caller must start one.
    pub spawn: bool,
}

/// First phase of a cancel that has been accepted by the table.
///
/// [`wait`](PendingCancel::wait) returns once the owning worker has removed the entry.
#[derive(Debug)]
pub struct PendingCancel {
    number: MessageNumber,
    done: oneshot::Receiver<()>,
}

impl PendingCancel {
    pub fn number(&self) -> MessageNumber {
        self.number
    }

    /// Waits until the entry is gone from the table.
    pub async fn wait(self) {
        // A dropped sender means the table itself is gone.
        let _ = self.done.await;
    }
}

/// Why a worker is told about a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// The request is due and is displayed.
    Due,
    /// The request was replaced since the worker last looked.
    Replaced,
    /// The request was cancelled and has been removed.
    Cancelled,
}

/// One line of work for a display worker, produced under the lock and printed after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub request: AlarmRequest,
}

/// What a worker does after printing its notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    /// Sleep until the earliest due time (or a wake).
    Wait(Instant),
    /// The partition is empty and the slot has been released.
    Exit,
}

/// Outcome of one worker pass over its partition.
#[derive(Debug)]
pub struct Cycle {
    pub notices: Vec<Notice>,
    pub next: Next,
}

/// Result of [`AlarmTable::recover`].
#[derive(Debug)]
pub struct Recovered {
    /// Cancels completed on behalf of the dead worker.
    pub notices: Vec<Notice>,
    /// The partition still has live requests and the slot is still claimed.
    pub respawn: bool,
}

/// Shared mapping from message number to the current alarm request.
pub struct AlarmTable {
    inner: Mutex<Inner>,
    wakers: Vec<Arc<Notify>>,
}

impl AlarmTable {
    /// Creates an empty table for a pool of `workers` slots (at least one).
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            inner: Mutex::new(Inner {
                entries: BTreeMap::new(),
                running: vec![false; workers],
            }),
            wakers: (0..workers).map(|_| Arc::new(Notify::new())).collect(),
        }
    }

    /// Number of worker slots.
    #[inline]
    pub fn workers(&self) -> usize {
        self.wakers.len()
    }

    /// Worker owning `number`.
    #[inline]
    pub fn owner(&self, number: MessageNumber) -> WorkerId {
        partition::owner(number, self.workers())
    }

    /// Wake signal of one worker slot.
    pub fn waker(&self, worker: WorkerId) -> Arc<Notify> {
        Arc::clone(&self.wakers[worker.index()])
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts `request` if its number is absent, replaces it otherwise.
    ///
    /// The stored [`RequestKind`] follows the outcome. Replacing an entry whose
    /// cancel is in flight only swaps its contents; the cancel still removes it.
    pub fn upsert(&self, mut request: AlarmRequest, due: Instant) -> Upserted {
        let number = request.number;
        let owner = self.owner(number);
        let mut inner = self.lock();

        let outcome = match inner.entries.entry(number) {
            MapEntry::Vacant(slot) => {
                request.kind = RequestKind::First;
                slot.insert(Entry {
                    request,
                    due,
                    announce: false,
                    cancel: None,
                });
                UpsertOutcome::Created
            }
            MapEntry::Occupied(mut slot) => {
                request.kind = RequestKind::Replacement;
                let entry = slot.get_mut();
                entry.request = request;
                entry.due = due;
                entry.announce = true;
                UpsertOutcome::Replaced
            }
        };

        let running = &mut inner.running[owner.index()];
        let spawn = !*running;
        *running = true;
        if !spawn {
            self.wakers[owner.index()].notify_one();
        }

        Upserted {
            outcome,
            owner,
            spawn,
        }
    }

    /// Marks a live request as cancel-pending and wakes its owner.
    ///
    /// If the owning slot has no running worker the entry is removed on the spot
    /// and the returned handle is already complete.
    pub fn begin_cancel(&self, number: MessageNumber) -> Result<PendingCancel, AlarmError> {
        let owner = self.owner(number);
        let mut inner = self.lock();
        let running = inner.running[owner.index()];

        let Some(entry) = inner.entries.get_mut(&number) else {
            return Err(AlarmError::NoSuchAlarm { number });
        };
        if entry.cancel.is_some() {
            return Err(AlarmError::DuplicateCancel { number });
        }

        let (tx, rx) = oneshot::channel();
        if running {
            entry.cancel = Some(tx);
            self.wakers[owner.index()].notify_one();
        } else {
            inner.entries.remove(&number);
            let _ = tx.send(());
        }
        Ok(PendingCancel { number, done: rx })
    }

    /// Cancels a live request and waits until it is gone.
    pub async fn cancel(&self, number: MessageNumber) -> Result<(), AlarmError> {
        self.begin_cancel(number)?.wait().await;
        Ok(())
    }

    /// One worker pass over its partition.
    ///
    /// 1. removes cancel-pending entries and acknowledges their cancels;
    /// 2. reports each replacement once;
    /// 3. collects due entries in `(due, number)` order, dropping one-shot ones
    ///    and rescheduling periodic ones;
    /// 4. releases the slot if nothing is left.
    pub fn cycle(&self, worker: WorkerId, now: Instant) -> Cycle {
        let workers = self.workers();
        let mut inner = self.lock();
        let mut notices = Vec::new();

        let mine: Vec<MessageNumber> = inner
            .entries
            .keys()
            .copied()
            .filter(|n| partition::owner(*n, workers) == worker)
            .collect();

        retire_cancelled(&mut inner.entries, &mine, &mut notices);

        for number in &mine {
            if let Some(entry) = inner.entries.get_mut(number) {
                if entry.announce {
                    entry.announce = false;
                    notices.push(Notice {
                        kind: NoticeKind::Replaced,
                        request: entry.request.clone(),
                    });
                }
            }
        }

        let mut due: Vec<(Instant, MessageNumber)> = mine
            .iter()
            .filter_map(|n| inner.entries.get(n))
            .filter(|e| e.due <= now)
            .map(|e| (e.due, e.request.number))
            .collect();
        due.sort_unstable();

        for (_, number) in due {
            let MapEntry::Occupied(mut slot) = inner.entries.entry(number) else {
                continue;
            };
            match slot.get().request.schedule {
                Schedule::Once { .. } => {
                    let entry = slot.remove();
                    notices.push(Notice {
                        kind: NoticeKind::Due,
                        request: entry.request,
                    });
                }
                Schedule::Every { period } => {
                    let entry = slot.get_mut();
                    notices.push(Notice {
                        kind: NoticeKind::Due,
                        request: entry.request.clone(),
                    });
                    entry.due = next_due(entry.due, period, now);
                }
            }
        }

        let earliest = mine
            .iter()
            .filter_map(|n| inner.entries.get(n))
            .map(|e| e.due)
            .min();
        let next = match earliest {
            Some(deadline) => Next::Wait(deadline),
            None => {
                inner.running[worker.index()] = false;
                Next::Exit
            }
        };

        Cycle { notices, next }
    }

    /// Releases a slot whose worker stops for a reason other than an empty partition.
    ///
    /// In-flight cancels of the partition are completed; live entries stay.
    pub fn detach(&self, worker: WorkerId) -> Vec<Notice> {
        self.release(worker, false).notices
    }

    /// Takes back the slot of a worker that died without releasing it.
    ///
    /// Completes in-flight cancels like [`detach`](Self::detach). If live
    /// entries remain the slot stays claimed and `respawn` tells the caller to
    /// start a replacement; upserts that arrived after the crash saw the slot
    /// as running and did not start one themselves.
    pub fn recover(&self, worker: WorkerId) -> Recovered {
        self.release(worker, true)
    }

    fn release(&self, worker: WorkerId, keep_if_live: bool) -> Recovered {
        let workers = self.workers();
        let mut inner = self.lock();
        let mut notices = Vec::new();

        let mine: Vec<MessageNumber> = inner
            .entries
            .keys()
            .copied()
            .filter(|n| partition::owner(*n, workers) == worker)
            .collect();
        retire_cancelled(&mut inner.entries, &mine, &mut notices);

        let respawn = keep_if_live && mine.iter().any(|n| inner.entries.contains_key(n));
        inner.running[worker.index()] = respawn;
        Recovered { notices, respawn }
    }

    /// Live requests owned by `worker`, ordered by due time then number.
    pub fn snapshot_for(&self, worker: WorkerId) -> Vec<AlarmRequest> {
        let workers = self.workers();
        let inner = self.lock();
        let mut live: Vec<&Entry> = inner
            .entries
            .values()
            .filter(|e| e.cancel.is_none())
            .filter(|e| partition::owner(e.request.number, workers) == worker)
            .collect();
        live.sort_by_key(|e| (e.due, e.request.number));
        live.into_iter().map(|e| e.request.clone()).collect()
    }

    /// Current live request for `number` (`None` if absent or cancel-pending).
    pub fn get(&self, number: MessageNumber) -> Option<AlarmRequest> {
        self.lock()
            .entries
            .get(&number)
            .filter(|e| e.cancel.is_none())
            .map(|e| e.request.clone())
    }

    /// True if `number` has a live, not cancel-pending request.
    pub fn contains(&self, number: MessageNumber) -> bool {
        self.get(number).is_some()
    }

    /// Number of entries, cancel-pending ones included.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Slots that currently have a worker attached.
    pub fn running_workers(&self) -> Vec<WorkerId> {
        self.lock()
            .running
            .iter()
            .enumerate()
            .filter(|(_, running)| **running)
            .map(|(i, _)| WorkerId::from_index(i))
            .collect()
    }
}

fn retire_cancelled(
    entries: &mut BTreeMap<MessageNumber, Entry>,
    mine: &[MessageNumber],
    notices: &mut Vec<Notice>,
) {
    for number in mine {
        if !entries.get(number).is_some_and(|e| e.cancel.is_some()) {
            continue;
        }
        if let Some(entry) = entries.remove(number) {
            if let Some(done) = entry.cancel {
                let _ = done.send(());
            }
            notices.push(Notice {
                kind: NoticeKind::Cancelled,
                request: entry.request,
            });
        }
    }
}

/// Roughly 30 years; stands in for deadlines the clock cannot represent.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// `from + after`, clamped to a far-future instant instead of overflowing.
pub(crate) fn deadline_after(from: Instant, after: Duration) -> Instant {
    from.checked_add(after)
        .or_else(|| from.checked_add(FAR_FUTURE))
        .unwrap_or(from)
}

/// Next display time of a periodic request; skips missed periods instead of bursting.
fn next_due(due: Instant, period: Duration, now: Instant) -> Instant {
    match due.checked_add(period) {
        Some(next) if next > now => next,
        _ => deadline_after(now, period),
    }
}
