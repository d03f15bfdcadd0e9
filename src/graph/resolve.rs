//! Specifier resolution.
//!
//! ```text
//! data:...          -> DataUri
//! node:path         -> path (prefix stripped)
//! @/app/App         -> <root>/src/app/App  (alias) -> probe
//! ./util.js         -> ./util.ts | ./util.tsx | ./util.js  (extension alias)
//! react             -> node_modules/react/package.json -> browser | module | main
//! fs                -> not found anywhere -> fallback (false = empty module)
//! ```

use std::path::{Path, PathBuf};

use dashmap::DashMap;
use serde_json::Value;
use thiserror::Error;

use crate::config::{Fallback, ResolveConfig};
use crate::utils::path::clean;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot resolve `{specifier}` from {from}")]
pub struct ResolveError {
    pub specifier: String,
    pub from: String,
}

/// Where a specifier points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    File { path: PathBuf, query: String },
    DataUri(String),
    /// A disabled Node built-in.
    Empty(String),
}

/// Conditions tried in a package's `exports`, in order.
const EXPORT_CONDITIONS: &[&str] = &["browser", "import", "module", "default", "require"];

pub struct Resolver {
    root: PathBuf,
    alias: Vec<(String, PathBuf)>,
    extensions: Vec<String>,
    extension_alias: Vec<(String, Vec<String>)>,
    main_fields: Vec<String>,
    fallback: Vec<(String, Fallback)>,
    manifests: DashMap<PathBuf, Option<Value>>,
}

impl Resolver {
    pub fn new(root: &Path, config: &ResolveConfig) -> Self {
        let mut alias: Vec<(String, PathBuf)> = config
            .alias
            .iter()
            .map(|(k, v)| (k.clone(), clean(&root.join(v))))
            .collect();
        // Longest key first so `@app` is tried before `@`
        alias.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        Self {
            root: root.to_path_buf(),
            alias,
            extensions: config.extensions.clone(),
            extension_alias: config
                .extension_alias
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            main_fields: config.main_fields.clone(),
            fallback: config
                .fallback
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            manifests: DashMap::new(),
        }
    }

    /// Resolve `specifier` as written in a file inside `from_dir`.
    pub fn resolve(&self, specifier: &str, from_dir: &Path) -> Result<Resolved, ResolveError> {
        if specifier.starts_with("data:") {
            return Ok(Resolved::DataUri(specifier.to_string()));
        }
        let (bare, query) = match specifier.split_once('?') {
            Some((path, query)) => (path, query.to_string()),
            None => (specifier, String::new()),
        };
        let bare = bare.strip_prefix("node:").unwrap_or(bare);

        if let Some(path) = self.resolve_path_spec(bare, from_dir) {
            return Ok(Resolved::File { path, query });
        }

        if let Some((_, fallback)) = self.fallback.iter().find(|(name, _)| name == bare) {
            match fallback {
                Fallback::Disabled(_) => return Ok(Resolved::Empty(bare.to_string())),
                Fallback::Module(target) => {
                    if let Some(path) = self.resolve_package(target, &self.root) {
                        return Ok(Resolved::File { path, query });
                    }
                }
            }
        }

        Err(ResolveError {
            specifier: specifier.to_string(),
            from: crate::utils::path::relative_slash(from_dir, &self.root),
        })
    }

    fn resolve_path_spec(&self, spec: &str, from_dir: &Path) -> Option<PathBuf> {
        for (key, target) in &self.alias {
            if spec == key {
                return self.resolve_file_or_dir(target);
            }
            if let Some(rest) = spec.strip_prefix(key.as_str())
                && let Some(rest) = rest.strip_prefix('/')
            {
                return self.resolve_file_or_dir(&target.join(rest));
            }
        }

        if spec.starts_with("./") || spec.starts_with("../") || spec == "." || spec == ".." {
            return self.resolve_file_or_dir(&clean(&from_dir.join(spec)));
        }
        if Path::new(spec).is_absolute() {
            return self.resolve_file_or_dir(Path::new(spec));
        }
        self.resolve_package(spec, from_dir)
    }

    /// Exact file, extension alias, probed extensions, then directory.
    fn resolve_file_or_dir(&self, path: &Path) -> Option<PathBuf> {
        self.resolve_file(path).or_else(|| self.resolve_dir(path))
    }

    fn resolve_file(&self, path: &Path) -> Option<PathBuf> {
        let text = path.to_string_lossy();
        for (written, probes) in &self.extension_alias {
            if let Some(stem) = text.strip_suffix(written.as_str()) {
                return probes
                    .iter()
                    .map(|ext| PathBuf::from(format!("{stem}{ext}")))
                    .find(|p| p.is_file());
            }
        }
        if path.is_file() {
            return Some(path.to_path_buf());
        }
        self.extensions
            .iter()
            .map(|ext| PathBuf::from(format!("{text}{ext}")))
            .find(|p| p.is_file())
    }

    fn resolve_dir(&self, dir: &Path) -> Option<PathBuf> {
        if !dir.is_dir() {
            return None;
        }
        if let Some(manifest) = self.manifest(dir)
            && let Some(entry) = self.manifest_entry(&manifest, ".")
            && let Some(found) = self.resolve_file_or_index(&clean(&dir.join(entry)))
        {
            return Some(found);
        }
        self.resolve_file(&dir.join("index"))
    }

    fn resolve_file_or_index(&self, path: &Path) -> Option<PathBuf> {
        self.resolve_file(path)
            .or_else(|| path.is_dir().then(|| self.resolve_file(&path.join("index"))).flatten())
    }

    /// `pkg`, `pkg/sub/path`, `@scope/pkg/sub` through `node_modules`.
    fn resolve_package(&self, spec: &str, from_dir: &Path) -> Option<PathBuf> {
        let (name, subpath) = split_package(spec)?;
        let mut dir = Some(from_dir);
        while let Some(current) = dir {
            let pkg_dir = current.join("node_modules").join(name);
            if pkg_dir.is_dir() {
                return self.resolve_in_package(&pkg_dir, subpath);
            }
            dir = current.parent();
        }
        None
    }

    fn resolve_in_package(&self, pkg_dir: &Path, subpath: &str) -> Option<PathBuf> {
        let manifest = self.manifest(pkg_dir);
        let key = if subpath.is_empty() { ".".to_string() } else { format!("./{subpath}") };

        if let Some(manifest) = &manifest
            && let Some(exports) = manifest.get("exports")
        {
            if let Some(target) = export_target(exports, &key) {
                return self.resolve_file_or_index(&clean(&pkg_dir.join(target)));
            }
        }

        if subpath.is_empty() {
            return self.resolve_dir(pkg_dir);
        }
        self.resolve_file_or_dir(&pkg_dir.join(subpath))
    }

    fn manifest_entry(&self, manifest: &Value, key: &str) -> Option<String> {
        if let Some(exports) = manifest.get("exports")
            && let Some(target) = export_target(exports, key)
        {
            return Some(target);
        }
        self.main_fields
            .iter()
            .filter_map(|field| manifest.get(field).and_then(Value::as_str))
            .find(|s| !s.is_empty())
            .map(str::to_string)
    }

    fn manifest(&self, dir: &Path) -> Option<Value> {
        if let Some(cached) = self.manifests.get(dir) {
            return cached.clone();
        }
        let value = std::fs::read_to_string(dir.join("package.json"))
            .ok()
            .and_then(|text| serde_json::from_str(&text).ok());
        self.manifests.insert(dir.to_path_buf(), value.clone());
        value
    }
}

/// `@scope/name/sub` -> (`@scope/name`, `sub`); `name/sub` -> (`name`, `sub`).
fn split_package(spec: &str) -> Option<(&str, &str)> {
    if spec.is_empty() {
        return None;
    }
    let segments = if spec.starts_with('@') { 2 } else { 1 };
    let mut end = 0;
    for _ in 0..segments {
        match spec[end..].find('/') {
            Some(i) => end += i + 1,
            None => return Some((spec, "")),
        }
    }
    Some((&spec[..end - 1], &spec[end..]))
}

/// Target of `key` in a package's `exports` field.
fn export_target(exports: &Value, key: &str) -> Option<String> {
    match exports {
        Value::String(s) if key == "." => Some(s.clone()),
        Value::Object(map) => {
            if map.keys().any(|k| k.starts_with('.')) {
                map.get(key).and_then(condition_target)
            } else if key == "." {
                condition_target(exports)
            } else {
                None
            }
        }
        _ => None,
    }
}

fn condition_target(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => EXPORT_CONDITIONS
            .iter()
            .filter_map(|c| map.get(*c))
            .find_map(condition_target),
        Value::Array(items) => items.iter().find_map(condition_target),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn project() -> (TempDir, Resolver) {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "src/index.tsx", "");
        write(root, "src/app/App.tsx", "");
        write(root, "src/util.ts", "");
        write(root, "src/lib/index.ts", "");
        write(root, "src/data.json", "{}");
        write(root, "node_modules/react/package.json", r#"{"main": "index.js"}"#);
        write(root, "node_modules/react/index.js", "");
        write(root, "node_modules/react/jsx-runtime.js", "");
        write(
            root,
            "node_modules/@remix-run/router/package.json",
            r#"{"main": "dist/router.cjs.js", "module": "dist/router.js"}"#,
        );
        write(root, "node_modules/@remix-run/router/dist/router.js", "");
        write(root, "node_modules/@remix-run/router/dist/router.cjs.js", "");
        write(
            root,
            "node_modules/modern/package.json",
            r#"{"exports": {".": {"import": "./esm/index.mjs", "require": "./cjs/index.cjs"}, "./extra": "./esm/extra.mjs"}}"#,
        );
        write(root, "node_modules/modern/esm/index.mjs", "");
        write(root, "node_modules/modern/esm/extra.mjs", "");
        write(root, "node_modules/path-browserify/package.json", r#"{"main": "index.js"}"#);
        write(root, "node_modules/path-browserify/index.js", "");
        let resolver = Resolver::new(root, &ResolveConfig::default());
        (dir, resolver)
    }

    fn file(resolved: Resolved) -> PathBuf {
        match resolved {
            Resolved::File { path, .. } => path,
            other => panic!("expected file, got {other:?}"),
        }
    }

    #[test]
    fn test_alias_and_extension_probing() {
        let (dir, r) = project();
        let src = dir.path().join("src");
        assert_eq!(file(r.resolve("@/app/App", &src).unwrap()), src.join("app/App.tsx"));
        assert_eq!(file(r.resolve("./util", &src).unwrap()), src.join("util.ts"));
        assert_eq!(file(r.resolve("./data.json", &src).unwrap()), src.join("data.json"));
    }

    #[test]
    fn test_extension_alias_maps_js_to_ts() {
        let (dir, r) = project();
        let src = dir.path().join("src");
        assert_eq!(file(r.resolve("./util.js", &src).unwrap()), src.join("util.ts"));
    }

    #[test]
    fn test_directory_index() {
        let (dir, r) = project();
        let src = dir.path().join("src");
        assert_eq!(file(r.resolve("./lib", &src).unwrap()), src.join("lib/index.ts"));
    }

    #[test]
    fn test_packages() {
        let (dir, r) = project();
        let root = dir.path();
        let app = root.join("src/app");
        assert_eq!(
            file(r.resolve("react", &app).unwrap()),
            root.join("node_modules/react/index.js")
        );
        assert_eq!(
            file(r.resolve("react/jsx-runtime", &app).unwrap()),
            root.join("node_modules/react/jsx-runtime.js")
        );
        assert_eq!(
            file(r.resolve("@remix-run/router", &app).unwrap()),
            root.join("node_modules/@remix-run/router/dist/router.js")
        );
        assert_eq!(
            file(r.resolve("modern", &app).unwrap()),
            root.join("node_modules/modern/esm/index.mjs")
        );
        assert_eq!(
            file(r.resolve("modern/extra", &app).unwrap()),
            root.join("node_modules/modern/esm/extra.mjs")
        );
    }

    #[test]
    fn test_query_and_node_prefix() {
        let (dir, r) = project();
        let src = dir.path().join("src");
        match r.resolve("./util?raw", &src).unwrap() {
            Resolved::File { query, .. } => assert_eq!(query, "raw"),
            other => panic!("{other:?}"),
        }
        assert_eq!(r.resolve("node:fs", &src).unwrap(), Resolved::Empty("fs".into()));
        assert_eq!(
            file(r.resolve("path", &src).unwrap()),
            dir.path().join("node_modules/path-browserify/index.js")
        );
    }

    #[test]
    fn test_unresolvable() {
        let (dir, r) = project();
        let err = r.resolve("./missing", &dir.path().join("src")).unwrap_err();
        assert_eq!(err.specifier, "./missing");
        assert_eq!(err.from, "src");
        assert!(r.resolve("left-pad", &dir.path().join("src")).is_err());
    }

    #[test]
    fn test_data_uri_passes_through() {
        let (dir, r) = project();
        let uri = "data:text/javascript,export default 1";
        assert_eq!(r.resolve(uri, dir.path()).unwrap(), Resolved::DataUri(uri.into()));
    }

    #[test]
    fn test_split_package() {
        assert_eq!(split_package("react"), Some(("react", "")));
        assert_eq!(split_package("react/jsx-runtime"), Some(("react", "jsx-runtime")));
        assert_eq!(split_package("@scope/pkg"), Some(("@scope/pkg", "")));
        assert_eq!(split_package("@scope/pkg/a/b"), Some(("@scope/pkg", "a/b")));
    }
}
