//! # Console: the protocol output channel.
//!
//! Acknowledgements from the dispatcher and display lines from the workers are
//! written through a shared [`Console`]. Each call writes one whole line, so
//! lines from concurrent workers never interleave mid-line.
//!
//! - [`StdoutConsole`]: the process's standard output (flushed per line).
//! - [`BufferConsole`]: in-memory capture for tests and embedding.

use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

/// Line sink shared by the dispatcher and every display worker.
pub trait Console: Send + Sync + 'static {
    /// Writes one complete line (without trailing newline).
    fn emit(&self, line: &str);

    /// Writes an input prompt. Ignored by default.
    fn prompt(&self, prompt: &str) {
        let _ = prompt;
    }
}

/// Writes to standard output.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutConsole;

impl Console for StdoutConsole {
    fn emit(&self, line: &str) {
        let mut out = io::stdout().lock();
        if let Err(e) = writeln!(out, "{line}").and_then(|()| out.flush()) {
            tracing::warn!(error = %e, "writing to stdout failed");
        }
    }

    fn prompt(&self, prompt: &str) {
        let mut out = io::stdout().lock();
        if let Err(e) = write!(out, "{prompt}").and_then(|()| out.flush()) {
            tracing::warn!(error = %e, "writing prompt failed");
        }
    }
}

/// Keeps every emitted line in memory.
#[derive(Debug, Default)]
pub struct BufferConsole {
    lines: Mutex<Vec<String>>,
}

impl BufferConsole {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all lines emitted so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Index of the first line containing `needle`.
    pub fn position(&self, needle: &str) -> Option<usize> {
        self.lines().iter().position(|l| l.contains(needle))
    }

    /// True if any line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.position(needle).is_some()
    }

    /// Number of lines containing `needle`.
    pub fn count(&self, needle: &str) -> usize {
        self.lines().iter().filter(|l| l.contains(needle)).count()
    }
}

impl Console for BufferConsole {
    fn emit(&self, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_string());
    }
}

/// Wall-clock seconds since the Unix epoch, as printed in display lines.
pub(crate) fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_console_queries() {
        let console = BufferConsole::new();
        console.prompt("Alarm> ");
        console.emit("First Alarm Request With Message Number 1");
        console.emit("Cancel Alarm Request With Message Number 1");

        assert_eq!(console.lines().len(), 2, "prompts are not recorded");
        assert_eq!(console.position("Cancel Alarm"), Some(1));
        assert_eq!(console.count("Message Number 1"), 2);
        assert!(!console.contains("Error"));
    }
}
