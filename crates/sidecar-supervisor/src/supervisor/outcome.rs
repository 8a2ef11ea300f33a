use strum::Display;

/// Detailed result of one start attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum StartOutcome {
    /// The backend was already accepting connections; nothing was spawned.
    AlreadyRunning,
    /// The backend became reachable within the startup timeout.
    Started,
    /// Another start attempt is in progress.
    Busy,
    /// No bundled deployment exists.
    Unavailable,
    /// The operating system refused to create the process.
    Failed,
    /// The backend did not become reachable before the startup timeout.
    TimedOut,
    /// The backend exited with a failure status before becoming reachable.
    Exited,
    /// A stop request interrupted the attempt.
    Cancelled,
}

impl StartOutcome {
    /// Whether the backend is reachable after this outcome.
    #[must_use]
    pub const fn is_reachable(self) -> bool {
        matches!(self, Self::AlreadyRunning | Self::Started)
    }
}
