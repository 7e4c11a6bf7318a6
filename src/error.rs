use std::io;

/// Errors surfaced to the user as a single line; none of them ends the interpreter.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("Pipe chains are not supported")]
    UnsupportedPipeChain,
    #[error("{0}")]
    Usage(String),
    #[error("{0}: command not found")]
    CommandNotFound(String),
    #[error("syntax error: missing command")]
    EmptyCommand,
    #[error("argument contains a NUL byte")]
    NulByte(#[from] std::ffi::NulError),
    #[error("Fork failed: {0}")]
    Fork(#[source] nix::Error),
    #[error("Piping failed: {0}")]
    Pipe(#[source] nix::Error),
    #[error("Waiting for process {pid} failed: {source}")]
    Wait {
        pid: i32,
        #[source]
        source: nix::Error,
    },
    #[error("Cannot redirect output to {path}: {source}")]
    Redirect {
        path: String,
        #[source]
        source: nix::Error,
    },
    #[error("cd: {path}: {source}")]
    ChangeDir {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Cannot determine working directory: {0}")]
    WorkingDir(#[source] io::Error),
    #[error(transparent)]
    Builtin(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ShellError>;
