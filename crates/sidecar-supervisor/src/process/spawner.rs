use std::ffi::OsString;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};

use tracing::debug;

#[cfg(unix)]
use libc::{SIGTERM, kill};

use crate::PROCESS_TARGET;
use crate::error::SpawnError;

/// Everything needed to launch the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    /// Program to execute.
    pub program: PathBuf,
    /// Working directory of the child.
    pub working_dir: PathBuf,
    /// Arguments passed after the program.
    pub args: Vec<OsString>,
    /// Environment variables added to the inherited environment.
    pub envs: Vec<(OsString, OsString)>,
}

impl LaunchSpec {
    /// Builds a launch of `program` inside `working_dir` with no extra
    /// arguments or environment.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            working_dir: working_dir.into(),
            args: Vec::new(),
            envs: Vec::new(),
        }
    }
}

/// Handle to a spawned backend process.
pub trait SupervisedChild: Send {
    /// Operating system process identifier.
    fn id(&self) -> u32;

    /// Takes the child's standard output stream, if still attached.
    fn take_stdout(&mut self) -> Option<Box<dyn Read + Send>>;

    /// Takes the child's standard error stream, if still attached.
    fn take_stderr(&mut self) -> Option<Box<dyn Read + Send>>;

    /// Requests a graceful exit. A child that has already been reaped is
    /// left alone.
    ///
    /// # Errors
    ///
    /// Returns the platform error when the request cannot be delivered.
    fn terminate(&mut self) -> io::Result<()>;

    /// Forces the child to exit.
    ///
    /// # Errors
    ///
    /// Returns the platform error, typically because the child already exited.
    fn kill(&mut self) -> io::Result<()>;

    /// Returns the exit status if the child has exited.
    ///
    /// # Errors
    ///
    /// Returns the platform error when the status cannot be queried.
    fn try_wait(&mut self) -> io::Result<Option<ExitStatus>>;
}

/// Creates backend processes.
pub trait ProcessSpawner: Send + Sync {
    /// Launches the backend described by `spec`.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnError`] when the operating system refuses to create the
    /// process.
    fn spawn(&self, spec: &LaunchSpec) -> Result<Box<dyn SupervisedChild>, SpawnError>;
}

/// Spawner backed by [`std::process::Command`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSpawner;

impl ProcessSpawner for SystemSpawner {
    fn spawn(&self, spec: &LaunchSpec) -> Result<Box<dyn SupervisedChild>, SpawnError> {
        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .envs(spec.envs.iter().map(|(key, value)| (key, value)))
            .current_dir(&spec.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        let child = command.spawn().map_err(|source| SpawnError::Launch {
            program: spec.program.clone(),
            source,
        })?;
        debug!(
            target: PROCESS_TARGET,
            pid = child.id(),
            program = %spec.program.display(),
            "spawned backend"
        );
        Ok(Box::new(SystemChild { child }))
    }
}

/// [`SupervisedChild`] wrapping a [`std::process::Child`].
#[derive(Debug)]
pub struct SystemChild {
    child: Child,
}

impl SystemChild {
    /// Wraps an already spawned child.
    #[must_use]
    pub const fn new(child: Child) -> Self {
        Self { child }
    }
}

impl SupervisedChild for SystemChild {
    fn id(&self) -> u32 {
        self.child.id()
    }

    fn take_stdout(&mut self) -> Option<Box<dyn Read + Send>> {
        self.child
            .stdout
            .take()
            .map(|stream| Box::new(stream) as Box<dyn Read + Send>)
    }

    fn take_stderr(&mut self) -> Option<Box<dyn Read + Send>> {
        self.child
            .stderr
            .take()
            .map(|stream| Box::new(stream) as Box<dyn Read + Send>)
    }

    #[cfg(unix)]
    fn terminate(&mut self) -> io::Result<()> {
        // Once reaped the PID may belong to an unrelated process.
        if self.child.try_wait()?.is_some() {
            return Ok(());
        }
        let pid = libc::pid_t::try_from(self.child.id())
            .map_err(|error| io::Error::new(io::ErrorKind::InvalidInput, error))?;
        // SAFETY: `kill(2)` takes no pointers; the child is unreaped, so the
        // PID still names it.
        let result = unsafe { kill(pid, SIGTERM) };
        if result == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }

    #[cfg(not(unix))]
    fn terminate(&mut self) -> io::Result<()> {
        self.child.kill()
    }

    fn kill(&mut self) -> io::Result<()> {
        self.child.kill()?;
        // Reap the child so it does not linger as a zombie.
        self.child.wait().map(drop)
    }

    fn try_wait(&mut self) -> io::Result<Option<ExitStatus>> {
        self.child.try_wait()
    }
}
