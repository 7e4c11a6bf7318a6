use crate::tokenize::tokenize;
use std::fmt;

/// Argument prefix of `a2path` meaning "keep the current entries and append".
pub const PRESERVE_EXISTING: &str = "$PATH";

/// Directories searched by default when no `--path` option is given.
pub const DEFAULT_SEARCH_PATH: &[&str] = &["/bin/", "/usr/bin/"];

/// Ordered list of directories consulted when resolving external commands.
///
/// Order is resolution precedence. Entries are kept exactly as the user typed
/// them; duplicates are allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPath {
    entries: Vec<String>,
}

impl SearchPath {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a `:`-separated list, e.g. the value of the `--path` option.
    pub fn parse(list: &str) -> Self {
        Self::new(tokenize(list, ":"))
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Apply an `a2path` argument.
    ///
    /// - no fields (missing or empty argument): the list is cleared;
    /// - first field equal to [`PRESERVE_EXISTING`]: the remaining fields are appended;
    /// - anything else: the list is replaced by the fields.
    pub fn update(&mut self, argument: Option<&str>) {
        let mut fields = tokenize(argument.unwrap_or_default(), ":");
        if fields.first().map(String::as_str) == Some(PRESERVE_EXISTING) {
            fields.remove(0);
            self.entries.extend(fields);
        } else {
            self.entries = fields;
        }
    }
}

impl Default for SearchPath {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_PATH.iter().copied())
    }
}

impl fmt::Display for SearchPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.entries.join(":"))
    }
}

/// Mutable interpreter state handed to every built-in.
///
/// The environment contains:
/// - `search_path`: directories consulted for external commands.
/// - `should_exit`: set by `exit`; the interpreter checks it after every statement.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    pub search_path: SearchPath,
    pub should_exit: bool,
}

impl Environment {
    pub fn new(search_path: SearchPath) -> Self {
        Self {
            search_path,
            should_exit: false,
        }
    }
}
