use strum::{Display, EnumString};

/// Lifecycle of the supervised backend as observed by the supervisor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LifecycleState {
    /// Nothing has been attempted yet.
    #[default]
    Idle,
    /// Checking whether the backend is already reachable.
    Resolving,
    /// Locating the deployment and spawning the backend.
    Starting,
    /// Backend spawned; polling for readiness.
    AwaitingReadiness,
    /// Backend accepts connections.
    Ready,
    /// No bundled deployment exists.
    Unavailable,
    /// Spawning failed, the child crashed, or readiness timed out.
    Failed,
    /// A stop is terminating the held child.
    Stopping,
    /// The held child has been terminated.
    Stopped,
}

impl LifecycleState {
    /// Returns `true` while a start attempt owns the lifecycle.
    #[must_use]
    pub const fn is_busy(self) -> bool {
        matches!(
            self,
            Self::Resolving | Self::Starting | Self::AwaitingReadiness
        )
    }

    /// Returns `true` when a new start must not begin: a start is in flight
    /// or a stop is still terminating the previous child.
    #[must_use]
    pub const fn blocks_start(self) -> bool {
        self.is_busy() || matches!(self, Self::Stopping)
    }

    /// Returns `true` when callers cannot use the backend right now.
    #[must_use]
    pub const fn is_unusable(self) -> bool {
        matches!(self, Self::Unavailable | Self::Failed)
    }
}
