//! A small interactive shell built directly on `fork`, `exec` and `pipe`.
//!
//! This crate turns one line of input into processes: statements are separated by
//! `;`, a statement is either a single command or two commands joined by `|`, its
//! output may be redirected to a file with `> file`, and a trailing `&` runs it in the
//! background. A handful of built-ins (`cd`, `pwd`, `$PATH`, `a2path`, `exit`) run in
//! the interpreter itself.
//!
//! The main entry point is [`Interpreter`], which owns the two pieces of state shared
//! between statements: the [`env::Environment`] (search path, exit request) and the
//! [`jobs::JobTracker`] of processes to clean up on exit.

mod builtin;
pub mod env;
pub mod error;
pub mod fd;
mod interpreter;
pub mod jobs;
pub mod launcher;
pub mod planner;
pub mod redirect;
pub mod resolve;
pub mod signals;
pub mod tokenize;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
pub type ExitCode = i32;

/// Just a convenient re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API.
pub use interpreter::Interpreter;

/// Serializes tests that change process-wide state (working directory, fd 1).
#[cfg(test)]
pub(crate) fn lock_process_state() -> std::sync::MutexGuard<'static, ()> {
    use std::sync::{Mutex, OnceLock};
    static MUTEX: OnceLock<Mutex<()>> = OnceLock::new();
    MUTEX
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|e| e.into_inner())
}
