//! Termination signal handling for the `run` command.

use std::io;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;
use tracing::info;

use crate::CLI_TARGET;

/// Abstraction over shutdown notification mechanisms.
pub(crate) trait ShutdownSignal {
    /// Returns `true` once shutdown has been requested. Never blocks.
    fn requested(&mut self) -> bool;
}

/// Errors reported by shutdown signal listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Shutdown listener that watches for termination signals.
pub(crate) struct SystemShutdownSignal {
    signals: Signals,
}

impl SystemShutdownSignal {
    /// Installs handlers for the usual termination signals.
    pub(crate) fn install() -> Result<Self, ShutdownError> {
        let signals = Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])
            .map_err(|source| ShutdownError::Install { source })?;
        Ok(Self { signals })
    }
}

impl ShutdownSignal for SystemShutdownSignal {
    fn requested(&mut self) -> bool {
        match self.signals.pending().next() {
            Some(signal) => {
                info!(target: CLI_TARGET, signal, "shutdown signal received");
                true
            }
            None => false,
        }
    }
}
