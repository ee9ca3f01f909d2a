//! # Global runtime configuration.
//!
//! Provides [`Config`], the centralized settings for [`AlarmService`](crate::AlarmService).
//!
//! ## Sentinel values
//! - `workers = 0` → treated as one worker slot
//! - `bus_capacity = 0` → clamped to 1
//! - `grace = 0s` → no wait, stuck workers are reported immediately

use std::time::Duration;

/// Global configuration for the alarm service.
///
/// ## Field semantics
/// - `workers`: number of display worker slots (fixed for the service's lifetime)
/// - `default_delay`: delay of Start/Replace commands without a schedule token
/// - `grace`: maximum wait for workers to stop once shutdown begins
/// - `bus_capacity`: event bus ring buffer size
/// - `linger`: at end of input, wait for every worker to drain instead of stopping
/// - `prompt`: text written before each command read (`None` = no prompt)
#[derive(Clone, Debug)]
pub struct Config {
    /// Number of display worker slots.
    ///
    /// Message number `n` belongs to slot `(n - 1) % workers`. Changing it changes
    /// every assignment, which is why it is fixed at construction.
    pub workers: usize,

    /// Delay used when a command carries no `in=` / `every=` token.
    pub default_delay: Duration,

    /// Maximum time to wait for workers to stop during shutdown.
    ///
    /// If exceeded, the service returns `RuntimeError::GraceExceeded`.
    pub grace: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,

    /// Keep running after end of input until every worker has exited on its own.
    pub linger: bool,

    /// Prompt written before reading each command.
    pub prompt: Option<String>,
}

impl Config {
    /// Worker slot count, at least one.
    #[inline]
    pub fn worker_count(&self) -> usize {
        self.workers.max(1)
    }

    /// Bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `workers = 4`
    /// - `default_delay = 5s`
    /// - `grace = 5s`
    /// - `bus_capacity = 1024`
    /// - `linger = false` (stop at end of input)
    /// - `prompt = None`
    fn default() -> Self {
        Self {
            workers: 4,
            default_delay: Duration::from_secs(5),
            grace: Duration::from_secs(5),
            bus_capacity: 1024,
            linger: false,
            prompt: None,
        }
    }
}
