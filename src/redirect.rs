use crate::tokenize::{REDIRECT_MARKER, WHITESPACE, tokenize};

/// Detect an output redirection clause in one command segment.
///
/// Returns the command text without the clause and the target filename. Only the
/// unambiguous form `command > file` is recognised: more than one marker, or a marker
/// followed by zero or several words, leaves the text untouched and yields no target.
pub fn extract_redirect(command: &str) -> (String, Option<String>) {
    let parts = tokenize(command, REDIRECT_MARKER);
    if let [before, after] = parts.as_slice() {
        if let [target] = tokenize(after, WHITESPACE).as_slice() {
            return (before.clone(), Some(target.clone()));
        }
    }
    (command.to_owned(), None)
}
