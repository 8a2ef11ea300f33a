//! CLI entrypoint for the sidecar backend supervisor.
//!
//! The binary delegates to [`sidecar_cli::run`], which loads configuration,
//! installs telemetry and dispatches the requested command.

use std::io::{self, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    // Left unlocked: supervisor threads log to stderr while `run` waits.
    let mut stderr = io::stderr();
    sidecar_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
