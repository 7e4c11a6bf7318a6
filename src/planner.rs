//! Classification of one statement into the kind of execution it needs.

use crate::redirect::extract_redirect;
use crate::tokenize::{PIPE_MARKER, WHITESPACE, tokenize};

/// Trailing argument requesting that the interpreter does not wait for the command.
pub const BACKGROUND_SENTINEL: &str = "&";

/// Names handled in-process instead of being executed.
pub const BUILTIN_NAMES: &[&str] = &["cd", "pwd", "$PATH", "a2path", "exit"];

/// One external command of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    /// Program name followed by its arguments, background sentinel removed.
    pub argv: Vec<String>,
    /// File that receives the standard output of this stage.
    pub redirect: Option<String>,
    /// Whether the stage was requested with a trailing [`BACKGROUND_SENTINEL`].
    pub background: bool,
}

impl Stage {
    /// Build a stage from already tokenized arguments, stripping a trailing
    /// background sentinel.
    pub fn new(mut argv: Vec<String>, redirect: Option<String>) -> Self {
        let background = argv.last().map(String::as_str) == Some(BACKGROUND_SENTINEL);
        if background {
            argv.pop();
        }
        Self {
            argv,
            redirect,
            background,
        }
    }

    fn from_segment(segment: &str) -> Self {
        let (command, redirect) = extract_redirect(segment);
        Self::new(tokenize(&command, WHITESPACE), redirect)
    }

    pub fn program(&self) -> Option<&str> {
        self.argv.first().map(String::as_str)
    }
}

/// Result of planning one statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    /// Nothing to run (blank statement).
    Empty,
    /// A built-in; `argv` is kept verbatim, a trailing `&` counts as an argument.
    Builtin {
        argv: Vec<String>,
        redirect: Option<String>,
    },
    /// A single external command.
    External(Stage),
    /// Two external commands, the first feeding the second.
    Piped(Stage, Stage),
    /// More than one pipe marker; never executed.
    Unsupported,
}

pub fn is_builtin(name: &str) -> bool {
    BUILTIN_NAMES.contains(&name)
}

/// Plan the execution of a single statement.
pub fn plan(statement: &str) -> Plan {
    let segments = tokenize(statement, PIPE_MARKER);
    match segments.as_slice() {
        [] => Plan::Empty,
        [single] => plan_single(single),
        [first, second] => Plan::Piped(Stage::from_segment(first), Stage::from_segment(second)),
        _ => Plan::Unsupported,
    }
}

fn plan_single(segment: &str) -> Plan {
    let (command, redirect) = extract_redirect(segment);
    let argv = tokenize(&command, WHITESPACE);
    match argv.first() {
        None => Plan::Empty,
        Some(name) if is_builtin(name) => Plan::Builtin { argv, redirect },
        Some(_) => Plan::External(Stage::new(argv, redirect)),
    }
}
