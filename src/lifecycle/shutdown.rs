//! Signal handling for graceful shutdown

use std::io;

#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};
use tracing::debug;

/// Handles shutdown signals (SIGTERM, SIGINT; Ctrl-C elsewhere)
pub struct ShutdownSignal {
    #[cfg(unix)]
    sigterm: Signal,
    #[cfg(unix)]
    sigint: Signal,
}

impl ShutdownSignal {
    /// Register the signal handlers; needs a running tokio runtime
    #[cfg(unix)]
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            sigterm: signal(SignalKind::terminate())?,
            sigint: signal(SignalKind::interrupt())?,
        })
    }

    #[cfg(not(unix))]
    pub fn new() -> io::Result<Self> {
        Ok(Self {})
    }

    /// Wait for a shutdown signal
    #[cfg(unix)]
    pub async fn wait(&mut self) {
        tokio::select! {
            _ = self.sigterm.recv() => {
                debug!("received SIGTERM");
            }
            _ = self.sigint.recv() => {
                debug!("received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    pub async fn wait(&mut self) {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(%e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
        debug!("received Ctrl-C");
    }
}
