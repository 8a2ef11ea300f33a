//! Lifecycle supervision for a locally bundled backend service.
//!
//! The crate locates a bundled copy of the backend ([`BundleResolver`]),
//! checks whether it already accepts connections ([`TcpProbe`]), and starts,
//! watches and stops it ([`Supervisor`]). Progress is broadcast as
//! [`StatusEvent`]s to any number of subscribers.
//!
//! Work runs on plain threads: the caller's thread (or the one started by
//! [`Supervisor::spawn_start`]) owns the state machine and readiness loop,
//! and two reader threads drain the child's output streams.

mod classifier;
mod deployment;
mod error;
mod probe;
mod process;
mod state;
mod status;
mod supervisor;

#[cfg(test)]
mod tests;

pub use classifier::{ClassifierRule, LogClassifier};
pub use deployment::{BundleLayout, BundleResolver, DeploymentInfo, DeploymentResolver, bundle_root};
pub use error::{ProbeError, SpawnError, SupervisorError};
pub use probe::{ReadinessProbe, TcpProbe};
pub use process::{LaunchSpec, ProcessSpawner, SupervisedChild, SystemChild, SystemSpawner};
pub use state::LifecycleState;
pub use status::{StatusEvent, StatusHub, StatusSubscription};
pub use supervisor::{
    HOST_ENV, PORT_ENV, StartOutcome, Supervisor, SupervisorBuilder, SupervisorSettings,
};

pub(crate) const LIFECYCLE_TARGET: &str = "sidecar_supervisor::lifecycle";
pub(crate) const PROCESS_TARGET: &str = "sidecar_supervisor::process";
pub(crate) const PROBE_TARGET: &str = "sidecar_supervisor::probe";
pub(crate) const OUTPUT_TARGET: &str = "sidecar_supervisor::output";
