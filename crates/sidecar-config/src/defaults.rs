use std::time::Duration;

use crate::logging::LogFormat;

/// Loopback host the bundled backend binds by default.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// TCP port the bundled backend listens on by default.
pub const DEFAULT_PORT: u16 = 9880;

/// Connect timeout applied to a single readiness probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(300);

/// Delay between readiness probes while waiting for the backend.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Overall readiness budget. Generous because the first launch may install
/// the backend's dependencies before it binds its port.
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(300);

/// Time a backend is given to exit after a graceful termination request.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(2);

/// Name of the service directory inside the bundle's resources directory.
pub const DEFAULT_SERVICE_DIR: &str = "backend";

/// Marker proving the backend's isolated runtime has been materialised.
pub const DEFAULT_RUNTIME_MARKER: &str = ".venv/pyvenv.cfg";

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Launcher script, relative to the deployment root.
#[cfg(windows)]
pub const DEFAULT_LAUNCHER: &str = "run.cmd";

/// Launcher script, relative to the deployment root.
#[cfg(not(windows))]
pub const DEFAULT_LAUNCHER: &str = "run.sh";

/// Default log filter expression used by the binaries.
#[must_use]
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default logging format for the binaries.
#[must_use]
pub fn default_log_format() -> LogFormat {
    LogFormat::Compact
}
