//! URL to filesystem path resolution.

use std::path::{Path, PathBuf};

/// Resolve a request URL to a file under `serve_root`. Directories map to
/// their `index.html`.
pub fn resolve_path(url: &str, serve_root: &Path) -> Option<PathBuf> {
    let clean = normalize_url(url);
    if clean.contains("..") {
        return None;
    }

    // Canonicalize so symlinks cannot lead outside the root.
    let canonical = serve_root.join(&clean).canonicalize().ok()?;
    let root_canonical = serve_root.canonicalize().ok()?;
    if !canonical.starts_with(&root_canonical) {
        return None;
    }

    if canonical.is_file() {
        return Some(canonical);
    }
    if canonical.is_dir() {
        let index = canonical.join("index.html");
        if index.is_file() {
            return Some(index);
        }
    }
    None
}

/// Client-side route of a single-page app: the last segment carries no
/// extension, so no real file is being asked for.
pub fn is_history_route(url: &str) -> bool {
    let clean = normalize_url(url);
    let last = clean.rsplit('/').next().unwrap_or_default();
    !last.contains('.')
}

/// Decode, drop query and fragment, trim slashes.
fn normalize_url(url: &str) -> String {
    use percent_encoding::percent_decode_str;

    let path = url.split(['?', '#']).next().unwrap_or(url);
    let decoded = percent_decode_str(path)
        .decode_utf8()
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_default();
    decoded.trim_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_files_and_index() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("static/js")).unwrap();
        std::fs::write(dir.path().join("index.html"), "<html>").unwrap();
        std::fs::write(dir.path().join("static/js/index.js"), "x").unwrap();
        std::fs::write(dir.path().join("a b.txt"), "x").unwrap();

        let root = dir.path().canonicalize().unwrap();
        assert_eq!(resolve_path("/", dir.path()), Some(root.join("index.html")));
        assert_eq!(
            resolve_path("/static/js/index.js?v=1", dir.path()),
            Some(root.join("static/js/index.js"))
        );
        assert_eq!(resolve_path("/a%20b.txt", dir.path()), Some(root.join("a b.txt")));
        assert_eq!(resolve_path("/static/js/missing.js", dir.path()), None);
        assert_eq!(resolve_path("/../etc/passwd", dir.path()), None);
        assert_eq!(resolve_path("/static/js", dir.path()), None);
    }

    #[test]
    fn test_history_routes() {
        assert!(is_history_route("/"));
        assert!(is_history_route("/dashboard/settings"));
        assert!(is_history_route("/users/42?tab=posts"));
        assert!(!is_history_route("/static/js/index.js"));
        assert!(!is_history_route("/favicon.ico"));
    }
}
