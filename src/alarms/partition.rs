//! # Worker partitioning.
//!
//! Maps a message number to the display worker that owns it. The function is
//! pure and depends only on the number and the (fixed) worker count, so a live
//! request can never be moved to another worker.
//!
//! ```text
//! workers = 3
//!   #1 #4 #7 ... ─► worker 1
//!   #2 #5 #8 ... ─► worker 2
//!   #3 #6 #9 ... ─► worker 3
//! ```

use std::fmt;

use super::MessageNumber;

/// Identity of a display worker slot.
///
/// Stored as a zero-based index; displayed one-based ("Display thread 1").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkerId(usize);

impl WorkerId {
    #[inline]
    pub fn from_index(index: usize) -> Self {
        Self(index)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0 + 1)
    }
}

/// Returns the worker owning `number` in a pool of `workers` slots.
///
/// A worker count of zero is treated as one.
#[inline]
pub fn owner(number: MessageNumber, workers: usize) -> WorkerId {
    let workers = workers.max(1);
    WorkerId((number.get() as usize - 1) % workers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(v: u32) -> MessageNumber {
        MessageNumber::new(v).unwrap()
    }

    #[test]
    fn test_round_robin_by_number() {
        assert_eq!(owner(n(1), 3), WorkerId(0));
        assert_eq!(owner(n(2), 3), WorkerId(1));
        assert_eq!(owner(n(3), 3), WorkerId(2));
        assert_eq!(owner(n(4), 3), WorkerId(0));
    }

    #[test]
    fn test_always_in_range_and_stable() {
        for workers in 1..8 {
            for v in 1..200 {
                let first = owner(n(v), workers);
                assert!(first.index() < workers);
                assert_eq!(first, owner(n(v), workers), "owner of #{v} changed");
            }
        }
    }

    #[test]
    fn test_zero_workers_means_one() {
        assert_eq!(owner(n(u32::MAX), 0), WorkerId(0));
    }

    #[test]
    fn test_display_is_one_based() {
        assert_eq!(WorkerId::from_index(0).to_string(), "1");
    }
}
