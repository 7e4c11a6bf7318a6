//! Owned descriptors for redirection and piping.
//!
//! Every descriptor created here is an [`OwnedFd`], so it is closed when dropped on
//! any exit path, in the parent as well as in a forked child.

use crate::error::{Result, ShellError};
use nix::NixPath;
use nix::fcntl::{FcntlArg, FdFlag, OFlag, fcntl, open};
use nix::sys::stat::Mode;
use nix::unistd::{dup2, pipe2};
use std::io::{self, Write};
use std::os::fd::{AsRawFd, FromRawFd, IntoRawFd, OwnedFd, RawFd};

pub const STDIN: RawFd = libc::STDIN_FILENO;
pub const STDOUT: RawFd = libc::STDOUT_FILENO;
pub const STDERR: RawFd = libc::STDERR_FILENO;

const NULL_DEVICE: &str = "/dev/null";

/// Open `path` for output, creating it with owner read/write permission and
/// truncating any previous content.
pub fn open_truncated<P: ?Sized + NixPath>(path: &P) -> nix::Result<OwnedFd> {
    let fd = open(
        path,
        OFlag::O_CREAT | OFlag::O_WRONLY | OFlag::O_TRUNC | OFlag::O_CLOEXEC,
        Mode::S_IRUSR | Mode::S_IWUSR,
    )?;
    // SAFETY: `open` just returned this descriptor and nothing else owns it.
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

/// Make `target` refer to the same open file as `fd`.
///
/// The duplicate does not inherit `O_CLOEXEC`, so it survives `exec`.
pub fn bind(fd: &OwnedFd, target: RawFd) -> nix::Result<()> {
    if fd.as_raw_fd() != target {
        dup2(fd.as_raw_fd(), target)?;
    }
    Ok(())
}

/// Like [`bind`], then close `fd` unless it already is `target`.
///
/// When it is, the descriptor is kept and its close-on-exec flag cleared instead.
pub fn bind_owned(fd: OwnedFd, target: RawFd) -> nix::Result<()> {
    if fd.as_raw_fd() == target {
        fcntl(target, FcntlArg::F_SETFD(FdFlag::empty()))?;
        let _ = fd.into_raw_fd();
        return Ok(());
    }
    bind(&fd, target)
}

/// Point standard output and standard error at the null device.
pub fn bind_null_sink() -> nix::Result<()> {
    let sink = open(NULL_DEVICE, OFlag::O_RDWR | OFlag::O_CLOEXEC, Mode::empty())?;
    // SAFETY: freshly opened, exclusively owned.
    let sink = unsafe { OwnedFd::from_raw_fd(sink) };
    bind(&sink, STDOUT)?;
    bind(&sink, STDERR)
}

/// Both ends of the pipe connecting two pipeline stages.
///
/// An end is taken (and closed by dropping it) by whichever process no longer needs
/// it; the parent ends up holding neither once both stages are spawned. Both ends are
/// close-on-exec, so only the copies bound to stdin/stdout reach the new program.
#[derive(Debug, Default)]
pub struct PipeEnds {
    pub read: Option<OwnedFd>,
    pub write: Option<OwnedFd>,
}

impl PipeEnds {
    /// No pipe at all, for stages that are not part of a pipeline.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn open() -> Result<Self> {
        let (read, write) = pipe2(OFlag::O_CLOEXEC).map_err(ShellError::Pipe)?;
        tracing::debug!(read = read.as_raw_fd(), write = write.as_raw_fd(), "pipe created");
        Ok(Self {
            read: Some(read),
            write: Some(write),
        })
    }

    pub fn close_read(&mut self) {
        self.read.take();
    }

    pub fn close_write(&mut self) {
        self.write.take();
    }
}

/// Standard output temporarily rebound to a file for an in-process command.
///
/// The previous stdout descriptor is duplicated on creation and put back when the guard
/// is dropped, whether the command succeeded or not.
#[derive(Debug)]
pub struct StdoutRedirect {
    saved: OwnedFd,
}

impl StdoutRedirect {
    pub fn to_file(path: &str) -> Result<Self> {
        let redirect_err = |source| ShellError::Redirect {
            path: path.to_owned(),
            source,
        };
        let target = open_truncated(path).map_err(redirect_err)?;
        let _ = io::stdout().flush();
        let saved = fcntl(STDOUT, FcntlArg::F_DUPFD_CLOEXEC(0)).map_err(redirect_err)?;
        // SAFETY: `fcntl` just returned this descriptor and nothing else owns it.
        let saved = unsafe { OwnedFd::from_raw_fd(saved) };
        bind(&target, STDOUT).map_err(redirect_err)?;
        tracing::debug!(path, "stdout redirected");
        Ok(Self { saved })
    }
}

impl Drop for StdoutRedirect {
    fn drop(&mut self) {
        let _ = io::stdout().flush();
        if let Err(e) = bind(&self.saved, STDOUT) {
            tracing::warn!("failed to restore stdout: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock_process_state;
    use nix::sys::stat::fstat;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_temp_file(tag: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("tinysh_fd_{}_{}_{}", tag, std::process::id(), nanos))
    }

    #[test]
    fn test_open_truncated_creates_owner_only_file() {
        let path = unique_temp_file("create");
        fs::write(&path, "previous content that is long").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o600)).unwrap();

        let fd = open_truncated(path.as_path()).expect("open");
        drop(fd);

        assert_eq!(fs::read_to_string(&path).unwrap(), "");
        fs::remove_file(&path).unwrap();

        let fd = open_truncated(path.as_path()).expect("open");
        drop(fd);
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode & !0o600, 0, "unexpected mode {:o}", mode);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_pipe_ends_close_independently() {
        let mut ends = PipeEnds::open().expect("pipe");
        assert!(ends.read.is_some() && ends.write.is_some());
        ends.close_write();
        assert!(ends.write.is_none());
        let read = ends.read.take().unwrap();
        let mut buf = [0u8; 4];
        // All writers are gone, so the read end reports end of file.
        let n = nix::unistd::read(read.as_raw_fd(), &mut buf).unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn test_bind_owned_in_place_survives_exec() {
        let mut ends = PipeEnds::open().expect("pipe");
        let write = ends.write.take().unwrap();
        let raw = write.as_raw_fd();
        assert_ne!(fcntl(raw, FcntlArg::F_GETFD).unwrap() & libc::FD_CLOEXEC, 0);

        bind_owned(write, raw).expect("bind in place");
        assert_eq!(fcntl(raw, FcntlArg::F_GETFD).unwrap() & libc::FD_CLOEXEC, 0);
        // SAFETY: `bind_owned` released ownership of `raw` without closing it.
        drop(unsafe { OwnedFd::from_raw_fd(raw) });
    }

    #[test]
    fn test_stdout_redirect_restores_descriptor() {
        let _lock = lock_process_state();
        let path = unique_temp_file("redirect");
        let before = fstat(STDOUT).unwrap();

        {
            let _guard = StdoutRedirect::to_file(path.to_str().unwrap()).expect("redirect");
            let mut out = io::stdout();
            out.write_all(b"into the file\n").unwrap();
            out.flush().unwrap();
        }

        let after = fstat(STDOUT).unwrap();
        assert_eq!((before.st_dev, before.st_ino), (after.st_dev, after.st_ino));
        assert!(fs::read_to_string(&path).unwrap().contains("into the file\n"));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_stdout_redirect_to_bad_path_leaves_stdout_alone() {
        let _lock = lock_process_state();
        let before = fstat(STDOUT).unwrap();
        let res = StdoutRedirect::to_file("/nonexistent_dir_for_tinysh/out.txt");
        assert!(matches!(res, Err(ShellError::Redirect { .. })));
        let after = fstat(STDOUT).unwrap();
        assert_eq!((before.st_dev, before.st_ino), (after.st_dev, after.st_ino));
    }
}
