//! # Alarm requests: the values stored in the alarm table.
//!
//! An [`AlarmRequest`] is keyed by its [`MessageNumber`] and carries a
//! [`Schedule`] plus the opaque message to display. The owning display worker
//! is never stored here; it is recomputed from the number by
//! [`partition::owner`](super::partition::owner).

use std::fmt;
use std::num::NonZeroU32;
use std::time::Duration;

/// Positive message number, the unique key of a live alarm request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageNumber(NonZeroU32);

impl MessageNumber {
    /// Returns `None` for zero.
    pub fn new(value: u32) -> Option<Self> {
        NonZeroU32::new(value).map(Self)
    }

    #[inline]
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for MessageNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a request entered the table.
///
/// The table rewrites this on insert: a request that created its entry is
/// [`RequestKind::First`], one that overwrote an existing entry is
/// [`RequestKind::Replacement`], whatever verb the command used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    First,
    Replacement,
}

/// When a request is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Display once, `after` the request was accepted.
    Once { after: Duration },
    /// Display every `period`, first one `period` after acceptance.
    Every { period: Duration },
}

impl Schedule {
    /// Delay between acceptance and the first display.
    #[inline]
    pub fn first_delay(&self) -> Duration {
        match self {
            Schedule::Once { after } => *after,
            Schedule::Every { period } => *period,
        }
    }

    #[inline]
    pub fn is_periodic(&self) -> bool {
        matches!(self, Schedule::Every { .. })
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schedule::Once { after } => write!(f, "in={}", DisplayDuration(*after)),
            Schedule::Every { period } => write!(f, "every={}", DisplayDuration(*period)),
        }
    }
}

/// Prints a duration in the same units the command grammar accepts.
struct DisplayDuration(Duration);

impl fmt::Display for DisplayDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ms = self.0.as_millis();
        if ms % 1000 == 0 {
            write!(f, "{}s", ms / 1000)
        } else {
            write!(f, "{ms}ms")
        }
    }
}

/// A numbered instruction to display a message at or after a scheduled time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmRequest {
    pub number: MessageNumber,
    pub kind: RequestKind,
    pub schedule: Schedule,
    pub message: String,
}

impl AlarmRequest {
    pub fn new(
        number: MessageNumber,
        kind: RequestKind,
        schedule: Schedule,
        message: impl Into<String>,
    ) -> Self {
        Self {
            number,
            kind,
            schedule,
            message: message.into(),
        }
    }
}
