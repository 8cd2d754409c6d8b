//! Path utilities for safe filesystem operations.

use std::path::{Component, Path};

/// Sanitize a string for use as a path component
///
/// Removes path traversal sequences and dangerous characters so a cache key or package name
/// can never address a file outside its cache directory.
#[must_use]
pub fn sanitize_path_component(s: &str) -> String {
    // Replace ".." but allow single "." so names like "net.http" survive
    let s = s.replace("..", "__");
    s.replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|'], "_")
}

/// Whether `name` is a single, plain file name
///
/// Rejects empty names, anything containing a path separator, and the `.`/`..` components.
#[must_use]
pub fn is_plain_file_name(name: &str) -> bool {
    if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
        return false;
    }

    let mut components = Path::new(name).components();
    matches!((components.next(), components.next()), (Some(Component::Normal(_)), None))
}

/// Express `path` relative to `root` using forward slashes
///
/// Paths outside `root` keep their components but lose any root or prefix.
#[must_use]
pub fn relative_slash_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let mut out = String::new();
    for component in relative.components() {
        if let Component::Normal(part) = component {
            if !out.is_empty() {
                out.push('/');
            }
            out.push_str(&part.to_string_lossy());
        }
    }

    if out.is_empty() { relative.to_string_lossy().replace('\\', "/") } else { out }
}
