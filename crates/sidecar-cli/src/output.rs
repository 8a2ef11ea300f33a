//! Human-readable rendering of supervisor output.

use std::io::{self, Write};

use sidecar_supervisor::{DeploymentInfo, StatusEvent};

/// Writes one status event as `[state] message`.
pub(crate) fn write_event<W: Write>(stdout: &mut W, event: &StatusEvent) -> io::Result<()> {
    writeln!(stdout, "[{}] {}", event.state, event.message)
}

/// Describes the resolved deployment, or its absence.
pub(crate) fn write_deployment<W: Write>(
    stdout: &mut W,
    deployment: Option<&DeploymentInfo>,
) -> io::Result<()> {
    let Some(deployment) = deployment else {
        return writeln!(stdout, "no bundled deployment found");
    };
    writeln!(stdout, "root: {}", deployment.root().display())?;
    writeln!(stdout, "launcher: {}", deployment.launcher().display())?;
    let installed = if deployment.runtime_installed() {
        "yes"
    } else {
        "no"
    };
    writeln!(stdout, "runtime installed: {installed}")
}
