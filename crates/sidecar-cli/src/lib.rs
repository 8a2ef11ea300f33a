//! Command-line runtime for supervising the bundled backend service.
//!
//! The module owns argument parsing, configuration bootstrapping, telemetry
//! installation and command dispatch. Configuration loading and shutdown
//! notification can be substituted so tests drive the runtime without
//! touching process-wide state.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use clap::error::ErrorKind;
use sidecar_config::Config;
use sidecar_supervisor::{
    BundleResolver, DeploymentResolver, LifecycleState, ReadinessProbe, StartOutcome,
    StatusSubscription, Supervisor, TcpProbe,
};
use tracing::{debug, info, warn};

mod cli;
mod config;
mod errors;
mod output;
mod shutdown;
mod telemetry;


use cli::{Cli, CliCommand};
use config::{ConfigArgumentSplit, split_config_arguments};
pub(crate) use config::{ConfigLoader, OrthoConfigLoader};
pub(crate) use errors::AppError;
use shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal};

pub(crate) const CLI_TARGET: &str = "sidecar_cli::run";

/// CLI flags recognised by the configuration loader.
///
/// MAINTENANCE: keep in sync with the fields of `sidecar_config::Config`.
const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--host",
    "--port",
    "--probe-timeout-ms",
    "--poll-interval-ms",
    "--startup-timeout-secs",
    "--grace-period-ms",
    "--service-dir",
    "--launcher",
    "--runtime-marker",
    "--service-root",
    "--log-filter",
    "--log-format",
];

/// How long the `run` loop waits for a status event before checking for
/// shutdown.
const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(100);

struct CliRunner<'a, W: Write, E: Write, L: ConfigLoader> {
    stdout: &'a mut W,
    stderr: &'a mut E,
    loader: &'a L,
}

impl<'a, W, E, L> CliRunner<'a, W, E, L>
where
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    fn new(stdout: &'a mut W, stderr: &'a mut E, loader: &'a L) -> Self {
        Self {
            stdout,
            stderr,
            loader,
        }
    }

    fn run<I, S, F>(&mut self, args: I, install_shutdown: F) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
        S: ShutdownSignal,
        F: FnOnce() -> Result<S, ShutdownError>,
    {
        let args: Vec<OsString> = args.into_iter().collect();
        let split = split_config_arguments(&args);
        let cli_arguments = prepare_cli_arguments(&args, &split);

        let cli = match Cli::try_parse_from(cli_arguments) {
            Ok(cli) => cli,
            Err(error) => return self.report_usage(error),
        };

        let result = self
            .loader
            .load(&split.config_arguments)
            .and_then(|config| {
                telemetry::initialise(&config)?;
                Ok(config)
            })
            .and_then(|config| match cli.command {
                CliCommand::Run => {
                    let mut shutdown = install_shutdown()?;
                    run_backend(&config, &mut *self.stdout, &mut shutdown)
                }
                CliCommand::Probe => probe_backend(&config, &mut *self.stdout),
                CliCommand::Resolve => resolve_backend(&config, &mut *self.stdout),
            });

        match result {
            Ok(exit_code) => exit_code,
            Err(error) => {
                if let Err(write_error) = writeln!(self.stderr, "{error}") {
                    debug!(target: CLI_TARGET, %write_error, "failed to report error");
                }
                ExitCode::FAILURE
            }
        }
    }

    fn report_usage(&mut self, error: clap::Error) -> ExitCode {
        let (written, exit_code) = match error.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                (write!(self.stdout, "{error}"), ExitCode::SUCCESS)
            }
            _ => (
                write!(self.stderr, "{}", AppError::CliUsage(error)),
                ExitCode::FAILURE,
            ),
        };
        if let Err(write_error) = written {
            debug!(target: CLI_TARGET, %write_error, "failed to report usage");
        }
        exit_code
    }
}

/// Runs the CLI using the provided arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with_loader(args, stdout, stderr, &OrthoConfigLoader, SystemShutdownSignal::install)
}

/// Runs the CLI with a custom configuration loader and shutdown listener.
pub(crate) fn run_with_loader<I, W, E, L, S, F>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    loader: &L,
    install_shutdown: F,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
    S: ShutdownSignal,
    F: FnOnce() -> Result<S, ShutdownError>,
{
    CliRunner::new(stdout, stderr, loader).run(args, install_shutdown)
}

fn prepare_cli_arguments(args: &[OsString], split: &ConfigArgumentSplit) -> Vec<OsString> {
    let mut cli_arguments: Vec<OsString> = Vec::new();
    if let Some(first) = args.first() {
        cli_arguments.push(first.clone());
    }
    if let Some(rest) = args.get(split.command_start..) {
        cli_arguments.extend(rest.iter().cloned());
    }
    cli_arguments
}

/// Starts the backend, echoes status events, and stops it on shutdown.
///
/// The loop also ends once the start attempt settles in a state from which
/// nothing further will happen.
fn run_backend<W, S>(config: &Config, stdout: &mut W, shutdown: &mut S) -> Result<ExitCode, AppError>
where
    W: Write,
    S: ShutdownSignal,
{
    let supervisor = Arc::new(Supervisor::from_config(config)?);
    let subscription = supervisor.subscribe();
    let start = supervisor.spawn_start().map_err(AppError::StartThread)?;
    info!(target: CLI_TARGET, port = config.port(), "supervising backend");

    let mut reached_ready = false;
    loop {
        if let Some(event) = subscription.recv_timeout(EVENT_POLL_INTERVAL) {
            reached_ready |= event.state == LifecycleState::Ready;
            output::write_event(stdout, &event).map_err(AppError::Output)?;
        }
        if shutdown.requested() {
            break;
        }
        if start.is_finished() && settled_without_backend(supervisor.state()) {
            break;
        }
    }

    supervisor.stop();
    let outcome = start.join().unwrap_or_else(|_| {
        warn!(target: CLI_TARGET, "start thread panicked");
        StartOutcome::Failed
    });
    reached_ready |= drain_events(&subscription, stdout)?;
    info!(target: CLI_TARGET, %outcome, "supervision finished");

    if outcome.is_reachable() || reached_ready {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

fn settled_without_backend(state: LifecycleState) -> bool {
    state.is_unusable() || state == LifecycleState::Stopped
}

fn drain_events<W: Write>(subscription: &StatusSubscription, stdout: &mut W) -> Result<bool, AppError> {
    let mut reached_ready = false;
    for event in subscription.try_iter() {
        reached_ready |= event.state == LifecycleState::Ready;
        output::write_event(stdout, &event).map_err(AppError::Output)?;
    }
    Ok(reached_ready)
}

fn probe_backend<W: Write>(config: &Config, stdout: &mut W) -> Result<ExitCode, AppError> {
    let probe = TcpProbe::new(config.host(), config.port(), config.probe_timeout())?;
    let address = probe.address();
    if probe.probe() {
        writeln!(stdout, "reachable: {address}").map_err(AppError::Output)?;
        Ok(ExitCode::SUCCESS)
    } else {
        writeln!(stdout, "not reachable: {address}").map_err(AppError::Output)?;
        Ok(ExitCode::FAILURE)
    }
}

fn resolve_backend<W: Write>(config: &Config, stdout: &mut W) -> Result<ExitCode, AppError> {
    let deployment = BundleResolver::from_config(config).resolve();
    output::write_deployment(stdout, deployment.as_ref()).map_err(AppError::Output)?;
    Ok(if deployment.is_some() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
