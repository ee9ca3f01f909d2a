//! # Cross-platform OS signal handling.
//!
//! [`ShutdownSignal`] registers its listeners up front, so a registration
//! failure surfaces before any command is read, and completes on the first
//! termination signal.
//!
//! **Unix platforms:** `SIGINT`, `SIGTERM`, `SIGQUIT`
//!
//! **Other platforms:** `Ctrl-C` via [`tokio::signal::ctrl_c`]

use std::io;

/// Registered termination signal listeners.
pub struct ShutdownSignal {
    #[cfg(unix)]
    listeners: [tokio::signal::unix::Signal; 3],
}

impl ShutdownSignal {
    /// Registers the listeners. Must be called inside a tokio runtime.
    #[cfg(unix)]
    pub fn install() -> io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            listeners: [
                signal(SignalKind::interrupt())?,
                signal(SignalKind::terminate())?,
                signal(SignalKind::quit())?,
            ],
        })
    }

    #[cfg(not(unix))]
    pub fn install() -> io::Result<Self> {
        Ok(Self {})
    }

    /// Completes when any registered signal arrives.
    #[cfg(unix)]
    pub async fn recv(self) {
        let [mut sigint, mut sigterm, mut sigquit] = self.listeners;
        tokio::select! {
            _ = sigint.recv() => {},
            _ = sigterm.recv() => {},
            _ = sigquit.recv() => {},
        }
    }

    #[cfg(not(unix))]
    pub async fn recv(self) {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
