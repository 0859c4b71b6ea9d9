use std::path::{Component, Path, PathBuf};

/// Normalizes a slash path: backslashes become slashes, `.` segments are
/// dropped and `..` pops the previous segment where possible. A leading
/// `prefix:` is kept as-is.
pub fn clean_path(path: &str) -> String {
    let path = path.replace('\\', "/");

    let (prefix, rest) = match path.find(':') {
        Some(idx) if !path[..idx].contains('/') => path.split_at(idx + 1),
        _ => ("", path.as_str()),
    };
    let (prefix, rest) = match rest.strip_prefix('/') {
        Some(stripped) => (format!("{prefix}/"), stripped),
        None => (prefix.to_string(), rest),
    };

    let mut elements: Vec<&str> = Vec::new();
    let mut tops = 0;
    for element in rest.split('/').rev() {
        match element {
            "." | "" => {}
            ".." => tops += 1,
            _ if tops > 0 => tops -= 1,
            _ => elements.push(element),
        }
    }
    elements.extend(std::iter::repeat_n("..", tops));
    elements.reverse();

    format!("{prefix}{}", elements.join("/"))
}

/// Replaces the last segment of `path` with `relative`.
pub fn apply_relative_path(path: &str, relative: &str) -> String {
    match path.rfind('/') {
        Some(idx) => {
            let mut out = path[..idx].to_string();
            if !relative.starts_with('/') {
                out.push('/');
            }
            out.push_str(relative);
            out
        }
        None => relative.to_string(),
    }
}

/// Slash-separated rendering of a filesystem path.
pub fn to_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Absolute, lexically normalized form of `path` without touching the filesystem.
pub fn absolutize(path: &Path) -> PathBuf {
    let base = if path.is_absolute() {
        PathBuf::new()
    } else {
        std::env::current_dir().unwrap_or_default()
    };
    let mut out = base;
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
