//! Shared configuration for the sidecar supervisor and its CLI.
//!
//! Values are layered by `ortho_config`: built-in defaults, then a
//! configuration file, then `SIDECAR_*` environment variables, then command
//! line flags. Durations are stored as integer milliseconds or seconds so
//! every layer can express them without a custom parser.

mod defaults;
mod logging;

use std::path::{Path, PathBuf};
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_GRACE_PERIOD, DEFAULT_HOST, DEFAULT_LAUNCHER, DEFAULT_LOG_FILTER,
    DEFAULT_POLL_INTERVAL, DEFAULT_PORT, DEFAULT_PROBE_TIMEOUT, DEFAULT_RUNTIME_MARKER,
    DEFAULT_SERVICE_DIR, DEFAULT_STARTUP_TIMEOUT, default_log_filter, default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Runtime configuration for supervising the bundled backend service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[serde(default)]
#[ortho_config(prefix = "SIDECAR")]
pub struct Config {
    /// Host the backend binds and the readiness probe connects to.
    pub host: String,
    /// TCP port the backend listens on.
    pub port: u16,
    /// Connect timeout for a single readiness probe, in milliseconds.
    pub probe_timeout_ms: u64,
    /// Delay between readiness probes, in milliseconds.
    pub poll_interval_ms: u64,
    /// Overall readiness budget for a start attempt, in seconds.
    pub startup_timeout_secs: u64,
    /// Time allowed for a graceful exit before a forced kill, in milliseconds.
    pub grace_period_ms: u64,
    /// Service directory name inside the bundle's resources directory.
    pub service_dir: String,
    /// Launcher script path relative to the deployment root.
    pub launcher: PathBuf,
    /// Runtime marker path relative to the deployment root.
    pub runtime_marker: PathBuf,
    /// Explicit deployment root that bypasses bundle layout discovery.
    pub service_root: Option<PathBuf>,
    /// Filter expression applied to tracing output.
    pub log_filter: String,
    /// Rendering used for tracing output.
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            probe_timeout_ms: millis(DEFAULT_PROBE_TIMEOUT),
            poll_interval_ms: millis(DEFAULT_POLL_INTERVAL),
            startup_timeout_secs: DEFAULT_STARTUP_TIMEOUT.as_secs(),
            grace_period_ms: millis(DEFAULT_GRACE_PERIOD),
            service_dir: DEFAULT_SERVICE_DIR.to_owned(),
            launcher: PathBuf::from(DEFAULT_LAUNCHER),
            runtime_marker: PathBuf::from(DEFAULT_RUNTIME_MARKER),
            service_root: None,
            log_filter: default_log_filter().to_owned(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Host the readiness probe targets.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port the readiness probe targets.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Connect timeout for a single readiness probe.
    #[must_use]
    pub const fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Delay between readiness probes.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Overall readiness budget for one start attempt.
    #[must_use]
    pub const fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }

    /// Grace period between a termination request and a forced kill.
    #[must_use]
    pub const fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    /// Service directory name inside the bundle's resources directory.
    #[must_use]
    pub fn service_dir(&self) -> &str {
        &self.service_dir
    }

    /// Launcher script path relative to the deployment root.
    #[must_use]
    pub fn launcher(&self) -> &Path {
        &self.launcher
    }

    /// Runtime marker path relative to the deployment root.
    #[must_use]
    pub fn runtime_marker(&self) -> &Path {
        &self.runtime_marker
    }

    /// Explicit deployment root, when configured.
    #[must_use]
    pub fn service_root(&self) -> Option<&Path> {
        self.service_root.as_deref()
    }

    /// Filter expression applied to tracing output.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Rendering used for tracing output.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
