//! Disposition of the interactive keyboard signals.
//!
//! The interpreter itself must survive Ctrl-C and Ctrl-Z, so it installs a handler that
//! only moves the cursor to a fresh line. The handler is installed without
//! `SA_RESTART`: a `waitpid` blocked on a foreground child returns `EINTR` when the
//! keystroke arrives, which the launcher treats as an indeterminate status.
//!
//! Children start with the parent's dispositions, so every forked child calls
//! [`reset_to_default`] before `exec` to stay killable by the same keystrokes.

use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};

/// Signals generated by the terminal for the foreground process group.
pub const INTERACTIVE: [Signal; 2] = [Signal::SIGINT, Signal::SIGTSTP];

extern "C" fn emit_newline(_signal: libc::c_int) {
    let newline = b"\n";
    // SAFETY: write(2) is async-signal-safe and the buffer outlives the call.
    unsafe {
        libc::write(libc::STDOUT_FILENO, newline.as_ptr().cast(), newline.len());
    }
}

/// Install the newline-only handler for [`INTERACTIVE`] signals in this process.
pub fn install() -> nix::Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(emit_newline),
        SaFlags::empty(),
        SigSet::empty(),
    );
    for sig in INTERACTIVE {
        // SAFETY: the handler only calls an async-signal-safe function.
        unsafe { signal::sigaction(sig, &action) }?;
    }
    tracing::debug!("interactive signal handlers installed");
    Ok(())
}

/// Restore default dispositions in a freshly forked child.
///
/// Also restores `SIGPIPE`, which the Rust runtime ignores and which `exec` would
/// otherwise keep ignored in the new program.
pub fn reset_to_default() {
    for sig in INTERACTIVE.into_iter().chain([Signal::SIGPIPE]) {
        // SAFETY: installing SIG_DFL never runs user code.
        let _ = unsafe { signal::signal(sig, SigHandler::SigDfl) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::sys::wait::{WaitStatus, waitpid};
    use nix::unistd::{ForkResult, fork, pause, pipe, read, write};

    #[test]
    fn test_interpreter_survives_interrupt() {
        install().expect("install handlers");
        signal::raise(Signal::SIGINT).expect("raise SIGINT");
        signal::raise(Signal::SIGTSTP).expect("raise SIGTSTP");
        // Reaching this point means neither signal terminated nor stopped the process.
    }

    #[test]
    fn test_child_with_default_disposition_dies_on_interrupt() {
        install().expect("install handlers");
        let (ready_read, ready_write) = pipe().expect("pipe");

        match unsafe { fork() }.expect("fork") {
            ForkResult::Child => {
                reset_to_default();
                let _ = write(&ready_write, b"x");
                loop {
                    pause();
                }
            }
            ForkResult::Parent { child } => {
                drop(ready_write);
                let mut buf = [0u8; 1];
                read(std::os::fd::AsRawFd::as_raw_fd(&ready_read), &mut buf).expect("read");
                signal::kill(child, Signal::SIGINT).expect("kill");
                let status = loop {
                    match waitpid(child, None) {
                        Err(nix::errno::Errno::EINTR) => continue,
                        other => break other.expect("waitpid"),
                    }
                };
                assert_eq!(status, WaitStatus::Signaled(child, Signal::SIGINT, false));
            }
        }
    }
}
