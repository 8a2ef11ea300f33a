use std::ffi::OsString;
use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::{Arc, Mutex};

use crate::classifier::LogClassifier;
use crate::deployment::DeploymentResolver;
use crate::error::SupervisorError;
use crate::probe::ReadinessProbe;
use crate::process::{ProcessSpawner, SystemSpawner};
use crate::status::StatusHub;

use super::{Supervisor, SupervisorSettings};

/// Assembles a [`Supervisor`] from its collaborators.
///
/// The probe and resolver are required; the spawner defaults to
/// [`SystemSpawner`] and the classifier to [`LogClassifier::default`].
pub struct SupervisorBuilder {
    settings: SupervisorSettings,
    probe: Option<Box<dyn ReadinessProbe>>,
    resolver: Option<Box<dyn DeploymentResolver>>,
    spawner: Box<dyn ProcessSpawner>,
    classifier: LogClassifier,
    launch_env: Vec<(OsString, OsString)>,
}

impl SupervisorBuilder {
    pub(super) fn new(settings: SupervisorSettings) -> Self {
        Self {
            settings,
            probe: None,
            resolver: None,
            spawner: Box::new(SystemSpawner),
            classifier: LogClassifier::default(),
            launch_env: Vec::new(),
        }
    }

    /// Sets the readiness probe.
    #[must_use]
    pub fn probe(mut self, probe: impl ReadinessProbe + 'static) -> Self {
        self.probe = Some(Box::new(probe));
        self
    }

    /// Sets the deployment resolver.
    #[must_use]
    pub fn resolver(mut self, resolver: impl DeploymentResolver + 'static) -> Self {
        self.resolver = Some(Box::new(resolver));
        self
    }

    /// Replaces the process spawner.
    #[must_use]
    pub fn spawner(mut self, spawner: impl ProcessSpawner + 'static) -> Self {
        self.spawner = Box::new(spawner);
        self
    }

    /// Replaces the log classifier.
    #[must_use]
    pub fn classifier(mut self, classifier: LogClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Adds an environment variable exported to the backend.
    #[must_use]
    pub fn launch_env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.launch_env.push((key.into(), value.into()));
        self
    }

    /// Validates the settings and builds the supervisor.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError`] when a timing is zero or a required
    /// collaborator is missing.
    pub fn build(self) -> Result<Supervisor, SupervisorError> {
        self.settings.validate()?;
        let probe = self.probe.ok_or(SupervisorError::MissingCollaborator {
            collaborator: "readiness probe",
        })?;
        let resolver = self.resolver.ok_or(SupervisorError::MissingCollaborator {
            collaborator: "deployment resolver",
        })?;
        Ok(Supervisor {
            settings: self.settings,
            probe,
            resolver,
            spawner: self.spawner,
            classifier: Arc::new(self.classifier),
            launch_env: self.launch_env,
            hub: Arc::new(StatusHub::new()),
            child: Mutex::new(None),
            generation: AtomicU64::new(0),
            detached: AtomicBool::new(false),
        })
    }
}
