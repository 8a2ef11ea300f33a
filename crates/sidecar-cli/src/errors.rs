//! Error types for the CLI runtime.

use std::io;
use std::sync::Arc;

use sidecar_supervisor::{ProbeError, SupervisorError};
use thiserror::Error;

use crate::shutdown::ShutdownError;
use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("invalid probe target: {0}")]
    Probe(#[from] ProbeError),
    #[error("failed to prepare the supervisor: {0}")]
    Supervisor(#[from] SupervisorError),
    #[error(transparent)]
    Shutdown(#[from] ShutdownError),
    #[error("failed to start the supervisor thread: {0}")]
    StartThread(io::Error),
    #[error("failed to write output: {0}")]
    Output(io::Error),
}
