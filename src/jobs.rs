//! Tracking of processes that need cleanup when the interpreter exits.

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::sys::wait::waitpid;
use nix::unistd::Pid;

/// Registry of processes the interpreter did not reap itself.
///
/// Holds every background process and every foreground process whose wait was
/// interrupted before a status was known. Entries are only removed by
/// [`JobTracker::shutdown`], which terminates and reaps them.
#[derive(Debug, Default)]
pub struct JobTracker {
    pids: Vec<Pid>,
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a process until shutdown.
    pub fn register(&mut self, pid: Pid) {
        tracing::debug!(pid = pid.as_raw(), "process registered for cleanup");
        self.pids.push(pid);
    }

    pub fn pids(&self) -> &[Pid] {
        &self.pids
    }

    pub fn len(&self) -> usize {
        self.pids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pids.is_empty()
    }

    /// Terminate and reap every tracked process, leaving the registry empty.
    ///
    /// `SIGCONT` follows `SIGTERM` so that a stopped process gets to act on the
    /// termination request instead of blocking the final wait forever.
    pub fn shutdown(&mut self) {
        for pid in self.pids.drain(..) {
            for sig in [Signal::SIGTERM, Signal::SIGCONT] {
                if let Err(e) = kill(pid, sig) {
                    tracing::debug!(pid = pid.as_raw(), "{} not delivered: {}", sig, e);
                }
            }
            reap(pid);
        }
    }
}

fn reap(pid: Pid) {
    loop {
        match waitpid(pid, None) {
            Err(Errno::EINTR) => continue,
            Err(Errno::ECHILD) => {
                tracing::debug!(pid = pid.as_raw(), "already reaped");
                return;
            }
            Err(e) => {
                tracing::warn!(pid = pid.as_raw(), "waitpid failed: {}", e);
                return;
            }
            Ok(status) => {
                tracing::debug!(pid = pid.as_raw(), ?status, "reaped");
                return;
            }
        }
    }
}
