//! Integration tests for the `sidecar` binary entry point.
//!
//! Exercises configuration flags ahead of the subcommand and the exit codes
//! reported for unreachable or missing backends, including a full `run`
//! with telemetry enabled.

use std::net::TcpListener;
use std::time::Duration;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::str::contains;
use tempfile::TempDir;

fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind listener");
    listener.local_addr().expect("listener address").port()
}

#[test]
fn probe_of_a_closed_port_exits_with_failure() {
    let port = unused_port().to_string();
    let mut command = cargo_bin_cmd!("sidecar");
    command.args(["--port", port.as_str(), "probe"]);
    command
        .assert()
        .failure()
        .stdout(contains(format!("not reachable: 127.0.0.1:{port}")));
}

#[test]
fn missing_subcommand_exits_with_failure() {
    let mut command = cargo_bin_cmd!("sidecar");
    command.assert().failure().stderr(contains("Usage"));
}

#[test]
fn resolve_reports_a_missing_deployment() {
    let root = TempDir::new().expect("create temp dir");
    let missing = root.path().join("missing");
    let mut command = cargo_bin_cmd!("sidecar");
    command.arg("--service-root").arg(&missing).arg("resolve");
    command
        .assert()
        .failure()
        .stdout(contains("no bundled deployment found"));
}

#[test]
fn run_reports_a_missing_deployment_with_default_logging() {
    let root = TempDir::new().expect("create temp dir");
    let missing = root.path().join("missing");
    let port = unused_port().to_string();
    let mut command = cargo_bin_cmd!("sidecar");
    command
        .args(["--port", port.as_str(), "--service-root"])
        .arg(&missing)
        .arg("run")
        .env_remove("SIDECAR_LOG_FILTER")
        .timeout(Duration::from_secs(20));
    command
        .assert()
        .failure()
        .stdout(contains("[resolving]"))
        .stdout(contains("[unavailable] No bundled backend found"));
}
