//! Lifecycle supervisor for the bundled backend.
//!
//! - `builder`: assembles a [`Supervisor`] from injectable collaborators.
//! - `settings`: timing policy for start and stop.
//! - `outcome`: detailed results of a start attempt.
//!
//! One supervisor is created per process by the composition root and shared
//! as `Arc<Supervisor>`. It alone mutates the lifecycle state and owns the
//! child handle; every other party observes it through status events.

mod builder;
mod outcome;
mod settings;

use std::ffi::OsString;
use std::io;
use std::process::ExitStatus;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use sidecar_config::Config;
use tracing::{debug, info, warn};

use crate::classifier::LogClassifier;
use crate::deployment::{BundleResolver, DeploymentInfo, DeploymentResolver};
use crate::error::SupervisorError;
use crate::probe::{ReadinessProbe, TcpProbe};
use crate::process::{LaunchSpec, ProcessSpawner, SupervisedChild, spawn_reader};
use crate::state::LifecycleState;
use crate::status::{StatusHub, StatusSubscription};
use crate::{LIFECYCLE_TARGET, PROCESS_TARGET};

pub use builder::SupervisorBuilder;
pub use outcome::StartOutcome;
pub use settings::SupervisorSettings;

const GRACE_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Environment variable carrying the host the backend should bind.
pub const HOST_ENV: &str = "SIDECAR_HOST";

/// Environment variable carrying the port the backend should bind.
pub const PORT_ENV: &str = "SIDECAR_PORT";

type HeldChild = Option<Box<dyn SupervisedChild>>;

enum ChildExit {
    Running,
    Detached,
    Crashed,
}

/// Starts, watches and stops the bundled backend.
pub struct Supervisor {
    settings: SupervisorSettings,
    probe: Box<dyn ReadinessProbe>,
    resolver: Box<dyn DeploymentResolver>,
    spawner: Box<dyn ProcessSpawner>,
    classifier: Arc<LogClassifier>,
    launch_env: Vec<(OsString, OsString)>,
    hub: Arc<StatusHub>,
    child: Mutex<HeldChild>,
    generation: AtomicU64,
    detached: AtomicBool,
}

impl Supervisor {
    /// Begins assembling a supervisor with the given timings.
    #[must_use]
    pub fn builder(settings: SupervisorSettings) -> SupervisorBuilder {
        SupervisorBuilder::new(settings)
    }

    /// Wires the production probe, resolver and spawner from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError`] when the probe address cannot be resolved
    /// or a configured timing is zero.
    pub fn from_config(config: &Config) -> Result<Self, SupervisorError> {
        let settings = SupervisorSettings::from_config(config);
        let probe = TcpProbe::new(config.host(), config.port(), settings.probe_timeout)?;
        Self::builder(settings)
            .probe(probe)
            .resolver(BundleResolver::from_config(config))
            .launch_env(HOST_ENV, config.host())
            .launch_env(PORT_ENV, config.port().to_string())
            .build()
    }

    /// Ensures the backend is running and reports whether it is reachable.
    ///
    /// Blocks until the attempt settles. Expected failures are reported
    /// through status events and a `false` return.
    pub fn start(&self) -> bool {
        self.start_outcome().is_reachable()
    }

    /// Runs [`Supervisor::start`] on a background thread.
    ///
    /// # Errors
    ///
    /// Returns the IO error raised when the thread cannot be created.
    pub fn spawn_start(self: &Arc<Self>) -> io::Result<JoinHandle<StartOutcome>> {
        let supervisor = Arc::clone(self);
        thread::Builder::new()
            .name("sidecar-start".to_owned())
            .spawn(move || supervisor.start_outcome())
    }

    /// Ensures the backend is running and reports how the attempt ended.
    pub fn start_outcome(&self) -> StartOutcome {
        let generation = self.generation.load(Ordering::SeqCst);
        if !self.hub.transition_unless_busy(
            LifecycleState::Resolving,
            "Checking whether the backend is already running",
        ) {
            debug!(
                target: LIFECYCLE_TARGET,
                "start ignored; another start or stop is in progress"
            );
            return StartOutcome::Busy;
        }

        if self.probe.probe() {
            return self.settle(
                generation,
                LifecycleState::Ready,
                "Backend already running",
                StartOutcome::AlreadyRunning,
            );
        }

        if self.held_child_running() {
            if !self.advance(
                generation,
                LifecycleState::AwaitingReadiness,
                "Waiting for the running backend to accept connections",
            ) {
                return StartOutcome::Cancelled;
            }
            return self.await_readiness(generation);
        }

        let Some(deployment) = self.resolver.resolve() else {
            return self.settle(
                generation,
                LifecycleState::Unavailable,
                "No bundled backend found",
                StartOutcome::Unavailable,
            );
        };
        self.launch(&deployment, generation)
    }

    /// Stops the held backend, if any.
    ///
    /// Sends a graceful termination request, waits up to the grace period
    /// and then always forces termination, ignoring the error raised when
    /// the backend already exited. The handle is released and the state
    /// becomes [`LifecycleState::Stopped`] regardless of how the backend
    /// ended. Without a held handle this only cancels an in-flight start.
    /// Starts are refused while the state is [`LifecycleState::Stopping`].
    pub fn stop(&self) {
        let child = {
            let mut held = self.lock_child();
            self.generation.fetch_add(1, Ordering::SeqCst);
            let child = held.take();
            if child.is_some() {
                self.hub
                    .transition(LifecycleState::Stopping, "Stopping backend");
            } else if self.detached.swap(false, Ordering::SeqCst) {
                warn!(
                    target: LIFECYCLE_TARGET,
                    "backend was detached by its launcher; it keeps running"
                );
                self.hub
                    .note("Backend runs detached from its launcher and was not stopped");
            }
            child
        };
        let Some(mut child) = child else {
            debug!(target: LIFECYCLE_TARGET, "stop requested with no backend process held");
            return;
        };
        self.shutdown(child.as_mut());
        if !self.hub.transition_from(
            LifecycleState::Stopping,
            LifecycleState::Stopped,
            "Backend stopped",
        ) {
            debug!(target: LIFECYCLE_TARGET, "stop finished after the state moved on");
        }
    }

    /// Probes the backend once, independently of the lifecycle state.
    pub fn is_running(&self) -> bool {
        self.probe.probe()
    }

    /// Whether a start attempt is in progress.
    pub fn is_starting(&self) -> bool {
        self.state().is_busy()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.hub.current().0
    }

    /// Latest status text.
    pub fn status_text(&self) -> String {
        self.hub.current().1
    }

    /// Subscribes to status events published from now on.
    pub fn subscribe(&self) -> StatusSubscription {
        self.hub.subscribe()
    }

    /// Resolves the bundled deployment.
    pub fn deployment(&self) -> Option<DeploymentInfo> {
        self.resolver.resolve()
    }

    /// Timing policy in effect.
    pub const fn settings(&self) -> &SupervisorSettings {
        &self.settings
    }

    fn launch(&self, deployment: &DeploymentInfo, generation: u64) -> StartOutcome {
        if !self.advance(
            generation,
            LifecycleState::Starting,
            format!("Starting backend from {}", deployment.root().display()),
        ) {
            return self.abandon();
        }
        if !deployment.runtime_installed() {
            self.hub
                .note("First launch: installing backend dependencies, this may take several minutes");
        }

        let spec = self.launch_spec(deployment);
        let mut child = match self.spawner.spawn(&spec) {
            Ok(child) => child,
            Err(error) => {
                warn!(target: PROCESS_TARGET, %error, "backend spawn failed");
                return self.settle(
                    generation,
                    LifecycleState::Failed,
                    format!("Failed to start backend: {error}"),
                    StartOutcome::Failed,
                );
            }
        };
        info!(target: PROCESS_TARGET, pid = child.id(), "backend process spawned");
        self.attach_readers(child.as_mut());

        {
            let mut held = self.lock_child();
            if self.is_cancelled(generation) {
                drop(held);
                self.shutdown(child.as_mut());
                return self.abandon();
            }
            *held = Some(child);
            self.detached.store(false, Ordering::SeqCst);
            self.hub.transition(
                LifecycleState::AwaitingReadiness,
                "Waiting for the backend to accept connections",
            );
        }
        self.await_readiness(generation)
    }

    fn await_readiness(&self, generation: u64) -> StartOutcome {
        let timeout = self.settings.startup_timeout;
        let deadline = Instant::now() + timeout;
        let mut detached = false;
        loop {
            if self.is_cancelled(generation) {
                return StartOutcome::Cancelled;
            }
            if self.probe.probe() {
                return self.settle_held(
                    generation,
                    LifecycleState::Ready,
                    "Backend started successfully",
                    StartOutcome::Started,
                );
            }
            if !detached {
                match self.check_exit(generation) {
                    ChildExit::Running => {}
                    ChildExit::Detached => detached = true,
                    ChildExit::Crashed => return StartOutcome::Exited,
                }
            }
            let now = Instant::now();
            if now >= deadline {
                warn!(
                    target: LIFECYCLE_TARGET,
                    timeout_ms = timeout.as_millis(),
                    "backend did not become reachable"
                );
                return self.settle_held(
                    generation,
                    LifecycleState::Failed,
                    format!("Backend failed to start within {timeout:?}"),
                    StartOutcome::TimedOut,
                );
            }
            thread::sleep(self.settings.poll_interval.min(deadline - now));
        }
    }

    /// Checks whether the held child exited before becoming reachable.
    ///
    /// A failure exit releases the handle and fails the attempt while the
    /// child lock is held, so a concurrent stop cannot interleave.
    fn check_exit(&self, generation: u64) -> ChildExit {
        let mut held = self.lock_child();
        if self.is_cancelled(generation) {
            return ChildExit::Running;
        }
        let Some(child) = held.as_mut() else {
            return ChildExit::Running;
        };
        match child.try_wait() {
            Ok(None) => ChildExit::Running,
            Ok(Some(status)) if status.success() => {
                // Reaped: the PID must not be signalled again.
                held.take();
                self.detached.store(true, Ordering::SeqCst);
                info!(
                    target: PROCESS_TARGET,
                    "launcher exited cleanly; waiting for the detached backend"
                );
                ChildExit::Detached
            }
            Ok(Some(status)) => {
                held.take();
                warn!(target: PROCESS_TARGET, %status, "backend exited before becoming ready");
                self.hub.transition(
                    LifecycleState::Failed,
                    format!("Backend exited before becoming ready ({})", describe_exit(status)),
                );
                ChildExit::Crashed
            }
            Err(error) => {
                warn!(target: PROCESS_TARGET, %error, "failed to poll backend status");
                ChildExit::Running
            }
        }
    }

    /// Returns `true` when a still-running child from an earlier attempt is
    /// held. A held child that has exited is released.
    fn held_child_running(&self) -> bool {
        let mut held = self.lock_child();
        let Some(child) = held.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                debug!(target: PROCESS_TARGET, %status, "releasing exited backend handle");
                held.take();
                false
            }
            Err(error) => {
                warn!(target: PROCESS_TARGET, %error, "failed to poll held backend");
                true
            }
        }
    }

    fn attach_readers(&self, child: &mut dyn SupervisedChild) {
        let streams = [("stdout", child.take_stdout()), ("stderr", child.take_stderr())];
        for (name, stream) in streams {
            let Some(stream) = stream else {
                continue;
            };
            if let Err(error) = spawn_reader(
                name,
                stream,
                Arc::clone(&self.classifier),
                Arc::clone(&self.hub),
            ) {
                warn!(target: PROCESS_TARGET, stream = name, %error, "failed to start output reader");
            }
        }
    }

    fn shutdown(&self, child: &mut dyn SupervisedChild) {
        let pid = child.id();
        if let Err(error) = child.terminate() {
            debug!(target: PROCESS_TARGET, pid, %error, "graceful termination request failed");
        }
        let deadline = Instant::now() + self.settings.grace_period;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    debug!(target: PROCESS_TARGET, pid, %status, "backend exited during grace period");
                    break;
                }
                Ok(None) => {}
                Err(error) => {
                    debug!(target: PROCESS_TARGET, pid, %error, "failed to poll backend during shutdown");
                    break;
                }
            }
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep(GRACE_POLL_INTERVAL.min(deadline - now));
        }
        // Forced termination is unconditional; it fails harmlessly when the
        // backend already exited.
        if let Err(error) = child.kill() {
            debug!(target: PROCESS_TARGET, pid, %error, "forced termination ignored");
        }
    }

    fn launch_spec(&self, deployment: &DeploymentInfo) -> LaunchSpec {
        let mut spec = LaunchSpec::new(deployment.launcher(), deployment.root());
        spec.envs.clone_from(&self.launch_env);
        spec
    }

    fn is_cancelled(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != generation
    }

    /// Publishes `state` unless a stop superseded this attempt.
    ///
    /// Holding the child lock orders the check against [`Supervisor::stop`].
    fn advance(&self, generation: u64, state: LifecycleState, message: impl Into<String>) -> bool {
        let _held = self.lock_child();
        if self.is_cancelled(generation) {
            return false;
        }
        self.hub.transition(state, message);
        true
    }

    /// Final transition for an attempt that holds no child of its own.
    fn settle(
        &self,
        generation: u64,
        state: LifecycleState,
        message: impl Into<String>,
        outcome: StartOutcome,
    ) -> StartOutcome {
        if self.advance(generation, state, message) {
            outcome
        } else {
            self.abandon()
        }
    }

    /// Final transition for an attempt whose child a stop may have taken.
    fn settle_held(
        &self,
        generation: u64,
        state: LifecycleState,
        message: impl Into<String>,
        outcome: StartOutcome,
    ) -> StartOutcome {
        if self.advance(generation, state, message) {
            outcome
        } else {
            StartOutcome::Cancelled
        }
    }

    /// Ends a cancelled attempt. A concurrent stop that is still
    /// terminating a child publishes `Stopped` itself.
    fn abandon(&self) -> StartOutcome {
        self.hub.transition_when(
            LifecycleState::is_busy,
            LifecycleState::Stopped,
            "Backend start cancelled",
        );
        StartOutcome::Cancelled
    }

    fn lock_child(&self) -> MutexGuard<'_, HeldChild> {
        self.child.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        let held = self.child.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(mut child) = held.take() {
            debug!(target: PROCESS_TARGET, pid = child.id(), "killing backend on supervisor drop");
            if let Err(error) = child.kill() {
                debug!(target: PROCESS_TARGET, %error, "forced termination ignored");
            }
        }
    }
}

fn describe_exit(status: ExitStatus) -> String {
    status
        .code()
        .map_or_else(|| status.to_string(), |code| format!("exit code {code}"))
}
