//! Splitting of raw input into non-empty fields.

/// Separates independent statements on one input line.
pub const STATEMENT_SEPARATOR: &str = ";";
/// Separates the two stages of a pipeline.
pub const PIPE_MARKER: &str = "|";
/// Introduces an output redirection clause.
pub const REDIRECT_MARKER: &str = ">";
/// Characters separating the arguments of a command.
pub const WHITESPACE: &str = " \t\r\n";

/// Split `text` on any character contained in `delimiters`.
///
/// Consecutive, leading and trailing delimiters never produce empty fields, so the
/// result is empty for empty or all-delimiter input.
///
/// ```
/// use tinysh::tokenize::tokenize;
/// assert_eq!(tokenize("  ls   -l ", " "), vec!["ls", "-l"]);
/// assert!(tokenize(";;;", ";").is_empty());
/// ```
pub fn tokenize(text: &str, delimiters: &str) -> Vec<String> {
    text.split(|c: char| delimiters.contains(c))
        .filter(|field| !field.is_empty())
        .map(str::to_owned)
        .collect()
}
