use crate::env::SearchPath;

/// List the paths an external command is attempted at, in order.
///
/// Behavior:
/// - Absolute name (starts with `/`): the name itself is the only candidate.
/// - Otherwise: `./name` first, then every search path entry, with a trailing `/`
///   ensured, followed by the name.
///
/// Nothing is checked for existence here; a candidate is only proven valid by a
/// successful `exec`.
pub fn resolve_candidates(command: &str, search_path: &SearchPath) -> Vec<String> {
    if command.starts_with('/') {
        return vec![command.to_owned()];
    }

    let mut candidates = Vec::with_capacity(search_path.entries().len() + 1);
    candidates.push(format!("./{}", command));
    for dir in search_path.entries() {
        let mut candidate = dir.clone();
        if !candidate.ends_with('/') {
            candidate.push('/');
        }
        candidate.push_str(command);
        candidates.push(candidate);
    }
    candidates
}
