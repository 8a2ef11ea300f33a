//! Scriptable stand-in for a spawned backend.

use std::io::{self, Cursor, Read};
use std::process::ExitStatus;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::SupervisedChild;

/// Behaviour of children handed out by the fake spawner.
#[derive(Debug, Clone, Default)]
pub(crate) struct ChildScript {
    /// Exit code reported from the first status poll, if any.
    pub exit_immediately: Option<i32>,
    /// Whether a graceful termination request ends the child.
    pub exit_on_terminate: bool,
    /// Bytes served on standard output.
    pub stdout: Vec<u8>,
}

/// Observable state of a [`FakeChild`].
#[derive(Debug, Default)]
pub(crate) struct ChildState {
    exit: Mutex<Option<ExitStatus>>,
    terminations: AtomicUsize,
    kills: AtomicUsize,
}

impl ChildState {
    pub(crate) fn terminations(&self) -> usize {
        self.terminations.load(Ordering::SeqCst)
    }

    pub(crate) fn kills(&self) -> usize {
        self.kills.load(Ordering::SeqCst)
    }

    pub(crate) fn has_exited(&self) -> bool {
        self.exit.lock().expect("child exit").is_some()
    }

    fn set_exit(&self, code: i32) {
        *self.exit.lock().expect("child exit") = Some(exit_status(code));
    }
}

#[derive(Debug)]
pub(crate) struct FakeChild {
    script: ChildScript,
    state: Arc<ChildState>,
    stdout: Option<Vec<u8>>,
}

impl FakeChild {
    pub(crate) fn new(script: ChildScript) -> Self {
        let state = Arc::new(ChildState::default());
        if let Some(code) = script.exit_immediately {
            state.set_exit(code);
        }
        let stdout = Some(script.stdout.clone());
        Self {
            script,
            state,
            stdout,
        }
    }

    pub(crate) fn state(&self) -> Arc<ChildState> {
        Arc::clone(&self.state)
    }
}

impl SupervisedChild for FakeChild {
    fn id(&self) -> u32 {
        4242
    }

    fn take_stdout(&mut self) -> Option<Box<dyn Read + Send>> {
        self.stdout
            .take()
            .map(|bytes| Box::new(Cursor::new(bytes)) as Box<dyn Read + Send>)
    }

    fn take_stderr(&mut self) -> Option<Box<dyn Read + Send>> {
        None
    }

    fn terminate(&mut self) -> io::Result<()> {
        self.state.terminations.fetch_add(1, Ordering::SeqCst);
        if self.script.exit_on_terminate {
            self.state.set_exit(0);
        }
        Ok(())
    }

    fn kill(&mut self) -> io::Result<()> {
        self.state.kills.fetch_add(1, Ordering::SeqCst);
        if self.state.has_exited() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "process already exited",
            ));
        }
        self.state.set_exit(137);
        Ok(())
    }

    fn try_wait(&mut self) -> io::Result<Option<ExitStatus>> {
        Ok(*self.state.exit.lock().expect("child exit"))
    }
}

#[cfg(unix)]
pub(crate) fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    ExitStatus::from_raw(code << 8)
}

#[cfg(windows)]
pub(crate) fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;
    ExitStatus::from_raw(code.unsigned_abs())
}
