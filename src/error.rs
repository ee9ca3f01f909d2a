//! Error types used by the alarmvisor runtime, the dispatcher and the alarm table.
//!
//! This module defines three error enums:
//!
//! - [`CommandError`]: a command line that failed validation (malformed).
//! - [`AlarmError`]: a well-formed cancel that the alarm table rejected.
//! - [`RuntimeError`]: errors raised by the orchestration runtime itself.
//!
//! All of them provide `as_label` / `as_message` helpers for logs. The first two
//! also know the exact protocol line they are reported with ([`CommandError::response`],
//! [`AlarmError::response`]).

use std::time::Duration;
use thiserror::Error;

use crate::alarms::{MessageNumber, WorkerId};

/// # Malformed command lines.
///
/// The two sub-kinds are reported differently: a recognised verb with broken
/// arguments is an *incorrect format*, an unrecognised verb is a *bad command*.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The verb was recognised but the rest of the line does not follow its grammar.
    #[error("incorrect format: {reason}")]
    IncorrectFormat {
        /// What exactly was wrong (for logs only; never printed on the protocol channel).
        reason: String,
    },

    /// The verb token is not one of the known commands.
    #[error("bad command: {verb:?}")]
    BadCommand {
        /// The offending verb token.
        verb: String,
    },
}

impl CommandError {
    pub(crate) fn format(reason: impl Into<String>) -> Self {
        CommandError::IncorrectFormat {
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use alarmvisor::CommandError;
    ///
    /// let err = CommandError::BadCommand { verb: "garbage".into() };
    /// assert_eq!(err.as_label(), "command_bad_verb");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            CommandError::IncorrectFormat { .. } => "command_incorrect_format",
            CommandError::BadCommand { .. } => "command_bad_verb",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            CommandError::IncorrectFormat { reason } => format!("incorrect format: {reason}"),
            CommandError::BadCommand { verb } => format!("unknown verb {verb:?}"),
        }
    }

    /// The line written back on the protocol channel.
    pub fn response(&self) -> String {
        match self {
            CommandError::IncorrectFormat { .. } => "Error: Incorrect format".to_string(),
            CommandError::BadCommand { .. } => "Bad command".to_string(),
        }
    }
}

/// # Rejected alarm table operations.
///
/// Both variants are recoverable; the table is left untouched when they are returned.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmError {
    /// Cancel target has no live request.
    #[error("no alarm request with message number {number}")]
    NoSuchAlarm {
        /// The message number that was not found.
        number: MessageNumber,
    },

    /// Another cancel for the same message number is still in flight.
    #[error("more than one request to cancel message number {number}")]
    DuplicateCancel {
        /// The message number being cancelled twice.
        number: MessageNumber,
    },
}

impl AlarmError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use alarmvisor::{AlarmError, MessageNumber};
    ///
    /// let number = MessageNumber::new(7).unwrap();
    /// let err = AlarmError::DuplicateCancel { number };
    /// assert_eq!(err.as_label(), "alarm_duplicate_cancel");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            AlarmError::NoSuchAlarm { .. } => "alarm_not_found",
            AlarmError::DuplicateCancel { .. } => "alarm_duplicate_cancel",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        self.to_string()
    }

    /// The message number the error refers to.
    pub fn number(&self) -> MessageNumber {
        match self {
            AlarmError::NoSuchAlarm { number } | AlarmError::DuplicateCancel { number } => *number,
        }
    }

    /// The line written back on the protocol channel.
    pub fn response(&self) -> String {
        match self {
            AlarmError::NoSuchAlarm { number } => {
                format!("Error: No Alarm Request With Message Number {number}")
            }
            AlarmError::DuplicateCancel { number } => format!(
                "Error: More Than One Request to Cancel Alarm Request With Message Number {number}"
            ),
        }
    }
}

/// # Errors produced by the alarmvisor runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some display workers were still running.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Display workers that did not stop in time.
        stuck: Vec<WorkerId>,
    },

    /// Reading the command stream failed.
    #[error("reading commands failed: {0}")]
    Input(#[source] std::io::Error),

    /// OS signal listeners could not be installed.
    #[error("installing signal handlers failed: {0}")]
    Signal(#[source] std::io::Error),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use alarmvisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::Input(_) => "runtime_input",
            RuntimeError::Signal(_) => "runtime_signal",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::GraceExceeded { grace, stuck } => {
                format!("grace exceeded after {grace:?}; stuck workers={stuck:?}")
            }
            RuntimeError::Input(e) => format!("input: {e}"),
            RuntimeError::Signal(e) => format!("signal: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(v: u32) -> MessageNumber {
        MessageNumber::new(v).unwrap()
    }

    #[test]
    fn test_command_error_responses() {
        assert_eq!(
            CommandError::format("missing number").response(),
            "Error: Incorrect format"
        );
        assert_eq!(
            CommandError::BadCommand {
                verb: "garbage".into()
            }
            .response(),
            "Bad command"
        );
    }

    #[test]
    fn test_alarm_error_responses() {
        assert_eq!(
            AlarmError::NoSuchAlarm { number: n(1) }.response(),
            "Error: No Alarm Request With Message Number 1"
        );
        assert_eq!(
            AlarmError::DuplicateCancel { number: n(42) }.response(),
            "Error: More Than One Request to Cancel Alarm Request With Message Number 42"
        );
        assert_eq!(AlarmError::NoSuchAlarm { number: n(9) }.number(), n(9));
    }

    #[test]
    fn test_runtime_labels() {
        let err = RuntimeError::Input(std::io::Error::other("closed"));
        assert_eq!(err.as_label(), "runtime_input");
        assert!(err.as_message().contains("closed"));
    }
}
