//! Creation, wiring and waiting of external command processes.
//!
//! A launch goes through two steps:
//! - [`spawn`] forks, wires the child's standard descriptors and tries every
//!   candidate path in order; the parent only closes the pipe end it no longer needs.
//! - [`settle`] either blocks on a foreground child or hands a background child to
//!   the [`JobTracker`].
//!
//! When no candidate can be executed the child exits with [`COMMAND_NOT_FOUND`],
//! which is the only way the parent learns about it.

use crate::ExitCode;
use crate::env::SearchPath;
use crate::error::{Result, ShellError};
use crate::fd::{self, PipeEnds, STDIN, STDOUT};
use crate::jobs::JobTracker;
use crate::planner::Stage;
use crate::resolve::resolve_candidates;
use crate::signals;
use nix::errno::Errno;
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::{ForkResult, Pid, execv, fork};
use std::ffi::CString;
use std::io::{self, Write};

/// Exit status of a child that found nothing to execute.
pub const COMMAND_NOT_FOUND: i32 = 20;

/// Exit status of a child that could not set up its descriptors.
const SETUP_FAILED: i32 = 1;

/// Position of a stage relative to the pipe shared with its neighbour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeRole {
    None,
    /// Standard output goes into the pipe.
    FeedsPipe,
    /// Standard input comes from the pipe.
    ReadsFromPipe,
}

/// A child process that has been created but not yet settled.
#[derive(Debug)]
#[must_use = "a spawned child must be settled to be waited for or tracked"]
pub struct Spawned {
    pub pid: Pid,
    pub program: String,
    pub background: bool,
}

/// How a launch ended from the interpreter's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The foreground child terminated; signal deaths are reported as `128 + signal`.
    Exited(ExitCode),
    /// The child runs in the background and is tracked for shutdown.
    Background(Pid),
    /// The wait was interrupted before a status was known; the child is tracked.
    Interrupted(Pid),
}

/// Everything the child needs, converted before `fork` so the child only wires
/// descriptors and calls `exec`.
struct ExecImage {
    candidates: Vec<CString>,
    argv: Vec<CString>,
    redirect: Option<CString>,
}

impl ExecImage {
    fn new(stage: &Stage, search_path: &SearchPath) -> Result<Self> {
        let program = stage.program().ok_or(ShellError::EmptyCommand)?;
        let candidates = resolve_candidates(program, search_path)
            .into_iter()
            .map(CString::new)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let argv = stage
            .argv
            .iter()
            .map(|arg| CString::new(arg.as_str()))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let redirect = stage.redirect.as_deref().map(CString::new).transpose()?;
        Ok(Self {
            candidates,
            argv,
            redirect,
        })
    }
}

/// Fork a child for `stage`, wired according to `role`.
///
/// In the parent, the pipe end belonging to `role` is closed before returning; the
/// other end stays in `pipe` for the neighbouring stage.
pub fn spawn(
    stage: &Stage,
    role: PipeRole,
    pipe: &mut PipeEnds,
    search_path: &SearchPath,
) -> Result<Spawned> {
    let image = ExecImage::new(stage, search_path)?;
    let _ = io::stdout().flush();

    // SAFETY: the interpreter is single-threaded; the child only wires descriptors
    // and replaces its image or exits.
    match unsafe { fork() } {
        Err(e) => Err(ShellError::Fork(e)),
        Ok(ForkResult::Child) => run_child(&image, stage.background, role, pipe),
        Ok(ForkResult::Parent { child }) => {
            match role {
                PipeRole::FeedsPipe => pipe.close_write(),
                PipeRole::ReadsFromPipe => pipe.close_read(),
                PipeRole::None => {}
            }
            tracing::debug!(
                pid = child.as_raw(),
                program = %stage.argv[0],
                ?role,
                background = stage.background,
                "spawned"
            );
            Ok(Spawned {
                pid: child,
                program: stage.argv[0].clone(),
                background: stage.background,
            })
        }
    }
}

fn run_child(image: &ExecImage, background: bool, role: PipeRole, pipe: &mut PipeEnds) -> ! {
    signals::reset_to_default();
    if let Err(e) = wire_child(image, background, role, pipe) {
        let _ = writeln!(io::stderr(), "tinysh: {}", e);
        exit_child(SETUP_FAILED);
    }
    for candidate in &image.candidates {
        // Only returns on failure; move on to the next candidate.
        let _ = execv(candidate, &image.argv);
    }
    exit_child(COMMAND_NOT_FOUND)
}

/// Leave a forked child without running the parent's exit handlers or flushing
/// its copied stdio buffers.
fn exit_child(code: i32) -> ! {
    // SAFETY: `_exit` is async-signal-safe and only terminates the calling process.
    unsafe { libc::_exit(code) }
}

fn wire_child(
    image: &ExecImage,
    background: bool,
    role: PipeRole,
    pipe: &mut PipeEnds,
) -> Result<()> {
    if let Some(path) = &image.redirect {
        let redirect_err = |source| ShellError::Redirect {
            path: path.to_string_lossy().into_owned(),
            source,
        };
        let file = fd::open_truncated(path.as_c_str()).map_err(redirect_err)?;
        fd::bind_owned(file, STDOUT).map_err(redirect_err)?;
    } else if role == PipeRole::FeedsPipe {
        pipe.close_read();
        if let Some(write) = pipe.write.take() {
            fd::bind_owned(write, STDOUT).map_err(ShellError::Pipe)?;
        }
    }
    if role == PipeRole::ReadsFromPipe {
        pipe.close_write();
        if let Some(read) = pipe.read.take() {
            fd::bind_owned(read, STDIN).map_err(ShellError::Pipe)?;
        }
    }
    if background {
        fd::bind_null_sink().map_err(ShellError::Pipe)?;
    }
    // Whatever is left (a redirected pipe feeder keeps both ends) is not needed.
    pipe.close_read();
    pipe.close_write();
    Ok(())
}

/// Wait for a foreground child, or register a background one.
pub fn settle(spawned: Spawned, jobs: &mut JobTracker) -> Result<Outcome> {
    if spawned.background {
        jobs.register(spawned.pid);
        println!("PID {} is running in the background", spawned.pid);
        return Ok(Outcome::Background(spawned.pid));
    }

    let pid = spawned.pid;
    match waitpid(pid, None) {
        Ok(WaitStatus::Exited(_, COMMAND_NOT_FOUND)) => {
            Err(ShellError::CommandNotFound(spawned.program))
        }
        Ok(WaitStatus::Exited(_, code)) => {
            tracing::debug!(pid = pid.as_raw(), code, "exited");
            Ok(Outcome::Exited(code))
        }
        Ok(WaitStatus::Signaled(_, sig, _)) => {
            tracing::debug!(pid = pid.as_raw(), %sig, "killed by signal");
            Ok(Outcome::Exited(128 + sig as i32))
        }
        Ok(status) => {
            tracing::debug!(pid = pid.as_raw(), ?status, "indeterminate wait status");
            jobs.register(pid);
            Ok(Outcome::Interrupted(pid))
        }
        Err(Errno::EINTR) => {
            tracing::debug!(pid = pid.as_raw(), "wait interrupted");
            jobs.register(pid);
            Ok(Outcome::Interrupted(pid))
        }
        Err(source) => Err(ShellError::Wait {
            pid: pid.as_raw(),
            source,
        }),
    }
}

/// Run a single external command.
pub fn launch(stage: &Stage, search_path: &SearchPath, jobs: &mut JobTracker) -> Result<Outcome> {
    let spawned = spawn(stage, PipeRole::None, &mut PipeEnds::none(), search_path)?;
    settle(spawned, jobs)
}

/// Run two external commands connected by a pipe.
///
/// Both children are created, feeding stage first, before either is waited for, so
/// they run concurrently. The outer error means nothing (or only the first stage)
/// could be started; the inner results are per stage.
pub fn launch_piped(
    first: &Stage,
    second: &Stage,
    search_path: &SearchPath,
    jobs: &mut JobTracker,
) -> Result<(Result<Outcome>, Result<Outcome>)> {
    if first.argv.is_empty() || second.argv.is_empty() {
        return Err(ShellError::EmptyCommand);
    }

    let mut pipe = PipeEnds::open()?;
    let feeder = spawn(first, PipeRole::FeedsPipe, &mut pipe, search_path)?;
    let reader = spawn(second, PipeRole::ReadsFromPipe, &mut pipe, search_path);
    drop(pipe);

    let first_outcome = settle(feeder, jobs);
    match reader {
        Ok(reader) => Ok((first_outcome, settle(reader, jobs))),
        Err(e) => {
            tracing::debug!(?first_outcome, "reading stage could not be started");
            Err(e)
        }
    }
}
