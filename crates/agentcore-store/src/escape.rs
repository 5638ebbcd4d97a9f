//! Project-path escaping into a filesystem-safe directory name.

/// Replaces path separators and anything else that isn't alphanumeric,
/// `-`, or `_` with `-`. Collapses runs of `-` so `/Users/jo//e/proj`
/// and `/Users/jo/e/proj` don't collide on escaping, though they still
/// land in the same bucket if the original paths were genuinely equal.
pub fn escape_project_path(path: &str) -> String {
    let mut escaped = String::with_capacity(path.len());
    let mut last_was_dash = false;
    for ch in path.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            escaped.push(ch);
            last_was_dash = false;
        } else if ch == '-' || !last_was_dash {
            escaped.push('-');
            last_was_dash = true;
        }
    }
    let trimmed = escaped.trim_matches('-');
    if trimmed.is_empty() {
        "root".to_string()
    } else {
        trimmed.to_string()
    }
}
