//! Path utilities.
//!
//! Module ids, chunk tests and output names all work on forward-slash
//! strings so results do not depend on the host platform.

use std::path::{Component, Path, PathBuf};

/// Normalize a file system path to absolute form.
///
/// Tries `canonicalize()` first, then falls back to joining with the
/// current directory.
#[inline]
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}

/// Lexically resolve `.` and `..` without touching the filesystem.
pub fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Render a path with `/` separators.
#[inline]
pub fn slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Path of `path` relative to `root`, with `/` separators.
///
/// Paths outside `root` are returned whole.
pub fn relative_slash(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .map_or_else(|_| slash(path), slash)
}

/// File stem up to the first dot: `logo.module.css` -> `logo`.
///
/// Hidden files keep their leading dot stripped: `.env` -> `env`.
pub fn base_name(path: &Path) -> String {
    let file = path.file_name().map(|s| s.to_string_lossy()).unwrap_or_default();
    let trimmed = file.trim_start_matches('.');
    trimmed.split('.').next().unwrap_or(trimmed).to_string()
}

/// Extension without the dot, lowercased.
pub fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}
