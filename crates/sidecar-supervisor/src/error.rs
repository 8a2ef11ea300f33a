//! Error types raised while wiring or driving the supervisor.
//!
//! Expected negative outcomes (no bundled deployment, a readiness timeout, a
//! crashed child) are reported through status events instead of these types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised when the operating system refuses to create the backend.
#[derive(Debug, Error)]
pub enum SpawnError {
    /// The launcher could not be executed.
    #[error("failed to launch '{}': {source}", .program.display())]
    Launch {
        /// Program that was being launched.
        program: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Errors raised while preparing the readiness probe.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The configured host could not be resolved.
    #[error("failed to resolve probe address {host}:{port}: {source}")]
    Resolve {
        /// Configured host name.
        host: String,
        /// Configured port.
        port: u16,
        /// Underlying resolver error.
        #[source]
        source: io::Error,
    },
    /// Resolution succeeded but produced no socket address.
    #[error("probe address {host}:{port} resolved to no socket addresses")]
    NoAddress {
        /// Configured host name.
        host: String,
        /// Configured port.
        port: u16,
    },
    /// A zero connect timeout would make every probe fail.
    #[error("probe timeout must be greater than zero")]
    ZeroTimeout,
}

/// Errors raised when the supervisor is assembled inconsistently.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// A zero poll interval would spin the readiness loop.
    #[error("poll interval must be greater than zero")]
    ZeroPollInterval,
    /// A zero startup timeout would fail every start immediately.
    #[error("startup timeout must be greater than zero")]
    ZeroStartupTimeout,
    /// A required collaborator was not supplied to the builder.
    #[error("supervisor builder is missing a {collaborator}")]
    MissingCollaborator {
        /// Name of the missing collaborator.
        collaborator: &'static str,
    },
    /// The readiness probe could not be prepared.
    #[error(transparent)]
    Probe(#[from] ProbeError),
}
