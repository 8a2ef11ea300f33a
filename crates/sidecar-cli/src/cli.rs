//! CLI argument definitions for the sidecar supervisor.

use clap::{Parser, Subcommand};

/// Command-line interface for supervising the bundled backend.
///
/// Configuration flags such as `--port` precede the subcommand and are
/// handled by the configuration loader, not by this parser.
#[derive(Parser, Debug)]
#[command(
    name = "sidecar",
    version,
    about = "Start, watch and stop the bundled backend service",
    disable_help_subcommand = true
)]
pub(crate) struct Cli {
    /// The action to perform.
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

/// Actions exposed by the CLI.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CliCommand {
    /// Starts the backend and supervises it until a termination signal.
    Run,
    /// Checks once whether the backend accepts connections.
    Probe,
    /// Reports where the bundled backend would be started from.
    Resolve,
}
