//! Test doubles for supervisor collaborators.
//!
//! Each fake shares its recorded state through an `Arc` so a test keeps a
//! handle after moving the fake into the supervisor.

mod child;

use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tempfile::TempDir;

use crate::{
    DeploymentInfo, DeploymentResolver, LaunchSpec, LifecycleState, ProcessSpawner, ReadinessProbe,
    SpawnError, StatusEvent, StatusSubscription, SupervisedChild, Supervisor, SupervisorSettings,
};

pub(crate) use child::{ChildScript, ChildState, FakeChild};

/// Fast timings so tests settle in milliseconds.
pub(crate) fn fast_settings() -> SupervisorSettings {
    SupervisorSettings {
        probe_timeout: Duration::from_millis(50),
        poll_interval: Duration::from_millis(5),
        startup_timeout: Duration::from_secs(2),
        grace_period: Duration::from_millis(20),
    }
}

#[derive(Debug, Default)]
struct ProbeLog {
    script: Mutex<VecDeque<bool>>,
    fallback: Mutex<bool>,
    successes: AtomicUsize,
    failures: AtomicUsize,
}

/// Probe replaying a scripted sequence, then a fallback answer.
#[derive(Debug, Clone, Default)]
pub(crate) struct ScriptedProbe {
    log: Arc<ProbeLog>,
}

impl ScriptedProbe {
    pub(crate) fn always(reachable: bool) -> Self {
        Self::sequence([], reachable)
    }

    pub(crate) fn sequence(outcomes: impl IntoIterator<Item = bool>, fallback: bool) -> Self {
        let probe = Self::default();
        probe.queue(outcomes);
        probe.set_fallback(fallback);
        probe
    }

    pub(crate) fn queue(&self, outcomes: impl IntoIterator<Item = bool>) {
        self.log.script.lock().expect("probe script").extend(outcomes);
    }

    pub(crate) fn set_fallback(&self, reachable: bool) {
        *self.log.fallback.lock().expect("probe fallback") = reachable;
    }

    pub(crate) fn successes(&self) -> usize {
        self.log.successes.load(Ordering::SeqCst)
    }

    pub(crate) fn failures(&self) -> usize {
        self.log.failures.load(Ordering::SeqCst)
    }

    pub(crate) fn calls(&self) -> usize {
        self.successes() + self.failures()
    }
}

impl ReadinessProbe for ScriptedProbe {
    fn probe(&self) -> bool {
        let scripted = self.log.script.lock().expect("probe script").pop_front();
        let reachable =
            scripted.unwrap_or_else(|| *self.log.fallback.lock().expect("probe fallback"));
        let counter = if reachable {
            &self.log.successes
        } else {
            &self.log.failures
        };
        counter.fetch_add(1, Ordering::SeqCst);
        reachable
    }
}

/// Resolver returning a fixed answer.
#[derive(Debug, Clone)]
pub(crate) struct StaticResolver(pub(crate) Option<DeploymentInfo>);

impl DeploymentResolver for StaticResolver {
    fn resolve(&self) -> Option<DeploymentInfo> {
        self.0.clone()
    }
}

/// Lays out a bundled backend inside `temp`.
pub(crate) fn bundled_deployment(temp: &TempDir, runtime_installed: bool) -> DeploymentInfo {
    let root = temp.path().join("backend");
    fs::create_dir_all(&root).expect("create deployment root");
    fs::write(root.join("run.sh"), "#!/bin/sh\n").expect("write launcher");
    if runtime_installed {
        fs::create_dir_all(root.join(".venv")).expect("create venv");
        fs::write(root.join(".venv/pyvenv.cfg"), "home = /usr\n").expect("write marker");
    }
    DeploymentInfo::new(root, Path::new("run.sh"), Path::new(".venv/pyvenv.cfg"))
}

#[derive(Debug, Default)]
struct SpawnLog {
    specs: Mutex<Vec<LaunchSpec>>,
    children: Mutex<Vec<Arc<ChildState>>>,
    failure: Mutex<Option<io::ErrorKind>>,
    script: Mutex<ChildScript>,
}

/// Spawner that records launches and hands out [`FakeChild`]ren.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeSpawner {
    log: Arc<SpawnLog>,
}

impl FakeSpawner {
    pub(crate) fn with_script(script: ChildScript) -> Self {
        let spawner = Self::default();
        *spawner.log.script.lock().expect("child script") = script;
        spawner
    }

    pub(crate) fn failing(kind: io::ErrorKind) -> Self {
        let spawner = Self::default();
        *spawner.log.failure.lock().expect("spawn failure") = Some(kind);
        spawner
    }

    pub(crate) fn spawned(&self) -> usize {
        self.log.specs.lock().expect("spawn specs").len()
    }

    pub(crate) fn last_spec(&self) -> Option<LaunchSpec> {
        self.log.specs.lock().expect("spawn specs").last().cloned()
    }

    pub(crate) fn last_child(&self) -> Option<Arc<ChildState>> {
        self.log.children.lock().expect("spawned children").last().cloned()
    }
}

impl ProcessSpawner for FakeSpawner {
    fn spawn(&self, spec: &LaunchSpec) -> Result<Box<dyn SupervisedChild>, SpawnError> {
        if let Some(kind) = *self.log.failure.lock().expect("spawn failure") {
            return Err(SpawnError::Launch {
                program: spec.program.clone(),
                source: io::Error::new(kind, "permission denied"),
            });
        }
        self.log.specs.lock().expect("spawn specs").push(spec.clone());
        let script = self.log.script.lock().expect("child script").clone();
        let child = FakeChild::new(script);
        self.log
            .children
            .lock()
            .expect("spawned children")
            .push(child.state());
        Ok(Box::new(child))
    }
}

/// Builds a supervisor around the given fakes.
pub(crate) fn supervisor(
    settings: SupervisorSettings,
    probe: &ScriptedProbe,
    resolver: StaticResolver,
    spawner: &FakeSpawner,
) -> Supervisor {
    Supervisor::builder(settings)
        .probe(probe.clone())
        .resolver(resolver)
        .spawner(spawner.clone())
        .launch_env("SIDECAR_HOST", "127.0.0.1")
        .launch_env("SIDECAR_PORT", "9880")
        .build()
        .expect("build supervisor")
}

/// Collects events until one carries `message`, or the deadline passes.
pub(crate) fn wait_for_message(
    subscription: &StatusSubscription,
    message: &str,
    timeout: Duration,
) -> Vec<StatusEvent> {
    let deadline = Instant::now() + timeout;
    let mut events = Vec::new();
    while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
        let Some(event) = subscription.recv_timeout(remaining) else {
            break;
        };
        let found = event.message == message;
        events.push(event);
        if found {
            break;
        }
    }
    events
}

/// Polls `supervisor` until it reports `state`, or the deadline passes.
pub(crate) fn wait_for_state(
    supervisor: &Supervisor,
    state: LifecycleState,
    timeout: Duration,
) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if supervisor.state() == state {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    supervisor.state() == state
}
