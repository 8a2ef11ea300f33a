//! Locates a backend bundled alongside the running application.
//!
//! Absence is a normal outcome: development builds run the backend
//! independently, so resolution reports "not present" rather than failing.

use std::env;
use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use sidecar_config::Config;
use tracing::debug;

use crate::LIFECYCLE_TARGET;

/// Resolved location of a bundled backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentInfo {
    root: PathBuf,
    launcher: PathBuf,
    runtime_marker: PathBuf,
}

impl DeploymentInfo {
    /// Builds deployment information rooted at `root`.
    ///
    /// `launcher` and `runtime_marker` are interpreted relative to `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, launcher: &Path, runtime_marker: &Path) -> Self {
        let root = root.into();
        Self {
            launcher: root.join(launcher),
            runtime_marker: root.join(runtime_marker),
            root,
        }
    }

    /// Deployment root, used as the backend's working directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of the launcher script.
    #[must_use]
    pub fn launcher(&self) -> &Path {
        &self.launcher
    }

    /// Absolute path of the installed-runtime marker.
    #[must_use]
    pub fn runtime_marker(&self) -> &Path {
        &self.runtime_marker
    }

    /// Whether the backend's isolated runtime has already been materialised.
    ///
    /// Advisory only: a missing runtime predicts a slow first start.
    #[must_use]
    pub fn runtime_installed(&self) -> bool {
        self.runtime_marker.is_file()
    }

    /// Whether the launcher script exists.
    #[must_use]
    pub fn launcher_exists(&self) -> bool {
        self.launcher.is_file()
    }
}

/// Source of the bundled backend's location.
pub trait DeploymentResolver: Send + Sync {
    /// Returns the bundled deployment, or `None` when no copy is present.
    fn resolve(&self) -> Option<DeploymentInfo>;
}

/// Names of the files that make up a bundled backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleLayout {
    /// Service directory inside the bundle's resources directory.
    pub service_dir: String,
    /// Launcher path relative to the deployment root.
    pub launcher: PathBuf,
    /// Runtime marker path relative to the deployment root.
    pub runtime_marker: PathBuf,
}

impl BundleLayout {
    /// Extracts the bundle layout from configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            service_dir: config.service_dir().to_owned(),
            launcher: config.launcher().to_path_buf(),
            runtime_marker: config.runtime_marker().to_path_buf(),
        }
    }
}

/// Computes where the host platform's bundle layout places the service.
///
/// macOS bundles keep resources in `Contents/Resources` next to the
/// `Contents/MacOS` executable directory; other platforms ship a
/// `resources` directory beside the executable.
#[must_use]
pub fn bundle_root(executable: &Path, service_dir: &str) -> Option<PathBuf> {
    let executable_dir = executable.parent()?;
    resources_dir(executable_dir).map(|resources| resources.join(service_dir))
}

#[cfg(target_os = "macos")]
fn resources_dir(executable_dir: &Path) -> Option<PathBuf> {
    executable_dir
        .parent()
        .map(|contents| contents.join("Resources"))
}

#[cfg(not(target_os = "macos"))]
fn resources_dir(executable_dir: &Path) -> Option<PathBuf> {
    Some(executable_dir.join("resources"))
}

/// Resolves the backend from the application bundle, caching the result.
#[derive(Debug)]
pub struct BundleResolver {
    executable: Option<PathBuf>,
    service_root: Option<PathBuf>,
    layout: BundleLayout,
    cache: OnceCell<Option<DeploymentInfo>>,
}

impl BundleResolver {
    /// Builds a resolver for `layout` without an executable location.
    #[must_use]
    pub fn new(layout: BundleLayout) -> Self {
        Self {
            executable: None,
            service_root: None,
            layout,
            cache: OnceCell::new(),
        }
    }

    /// Builds a resolver anchored at the current executable.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let executable = match env::current_exe() {
            Ok(path) => Some(path),
            Err(error) => {
                debug!(
                    target: LIFECYCLE_TARGET,
                    %error,
                    "current executable unavailable; bundle discovery disabled"
                );
                None
            }
        };
        let mut resolver = Self::new(BundleLayout::from_config(config));
        resolver.executable = executable;
        resolver.service_root = config.service_root().map(Path::to_path_buf);
        resolver
    }

    /// Anchors bundle discovery at `executable`.
    #[must_use]
    pub fn with_executable(mut self, executable: impl Into<PathBuf>) -> Self {
        self.executable = Some(executable.into());
        self
    }

    /// Uses `root` instead of bundle discovery.
    #[must_use]
    pub fn with_service_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.service_root = Some(root.into());
        self
    }

    fn candidate_root(&self) -> Option<PathBuf> {
        if let Some(root) = &self.service_root {
            return Some(root.clone());
        }
        let executable = self.executable.as_deref()?;
        bundle_root(executable, &self.layout.service_dir)
    }

    fn discover(&self) -> Option<DeploymentInfo> {
        let Some(root) = self.candidate_root() else {
            debug!(target: LIFECYCLE_TARGET, "no candidate deployment root");
            return None;
        };
        if !root.is_dir() {
            debug!(
                target: LIFECYCLE_TARGET,
                root = %root.display(),
                "no bundled backend directory"
            );
            return None;
        }
        let info = DeploymentInfo::new(root, &self.layout.launcher, &self.layout.runtime_marker);
        if !info.launcher_exists() {
            debug!(
                target: LIFECYCLE_TARGET,
                launcher = %info.launcher().display(),
                "bundled backend directory has no launcher"
            );
            return None;
        }
        debug!(
            target: LIFECYCLE_TARGET,
            root = %info.root().display(),
            runtime_installed = info.runtime_installed(),
            "resolved bundled backend"
        );
        Some(info)
    }
}

impl DeploymentResolver for BundleResolver {
    fn resolve(&self) -> Option<DeploymentInfo> {
        self.cache.get_or_init(|| self.discover()).clone()
    }
}
