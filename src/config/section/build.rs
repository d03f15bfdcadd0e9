//! `[build]` section configuration.
//!
//! ```toml
//! [build]
//! output = "dist"               # Output directory (relative to project root)
//! public_dir = "public"         # Copied verbatim into the output
//! script_target = "es2020"      # Syntax level for compiled scripts
//! inline_limit = 4096           # Data-URI threshold in bytes
//! minify = true                 # Defaults to on in production only
//!
//! [build.entries]
//! index = "./src/index.tsx"
//!
//! [build.targets]
//! chrome = "100"                # CSS downcompilation targets
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::ConfigDiagnostics;
use crate::core::BuildMode;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Entry name -> entry module. Names become chunk names.
    pub entries: BTreeMap<String, PathBuf>,

    /// Build output directory.
    pub output: PathBuf,

    /// Static files copied as-is into the output root.
    pub public_dir: PathBuf,

    /// URL prefix for emitted assets. `/` in development, `./` in production
    /// when unset.
    pub public_path: Option<String>,

    /// ECMAScript level passed to the script compiler.
    pub script_target: String,

    /// Minify scripts and styles. `None` follows the build mode.
    pub minify: Option<bool>,

    /// Resources at or below this size become data URIs.
    pub inline_limit: u64,

    /// Browser versions for CSS downcompilation.
    pub targets: TargetsConfig,

    /// Clean output directory before building (CLI only).
    #[serde(skip)]
    pub clean: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            entries: BTreeMap::from([("index".to_string(), PathBuf::from("./src/index.tsx"))]),
            output: "dist".into(),
            public_dir: "public".into(),
            public_path: None,
            script_target: "es2020".into(),
            minify: None,
            inline_limit: 4096,
            targets: TargetsConfig::default(),
            clean: false,
        }
    }
}

impl BuildConfig {
    pub fn public_path(&self, mode: BuildMode) -> String {
        let path = self
            .public_path
            .clone()
            .unwrap_or_else(|| if mode.is_dev() { "/" } else { "./" }.to_string());
        if path.ends_with('/') { path } else { format!("{path}/") }
    }

    pub fn minify(&self, mode: BuildMode) -> bool {
        self.minify.unwrap_or(!mode.is_dev())
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.entries.is_empty() {
            diag.error("build.entries", "at least one entry is required");
        }
        for (name, _) in &self.entries {
            if name.is_empty() || name.contains(['/', '\\']) {
                diag.error_with_hint(
                    "build.entries",
                    format!("invalid entry name `{name}`"),
                    "entry names become file names and may not contain path separators",
                );
            }
        }
        if self.output.as_os_str().is_empty() {
            diag.error("build.output", "output directory must not be empty");
        }
        self.targets.validate(diag);
    }
}

/// Browser targets as `major` or `major.minor` version strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetsConfig {
    pub chrome: Option<String>,
    pub firefox: Option<String>,
    pub safari: Option<String>,
}

impl Default for TargetsConfig {
    fn default() -> Self {
        Self {
            chrome: Some("120".into()),
            firefox: Some("120".into()),
            safari: Some("17".into()),
        }
    }
}

impl TargetsConfig {
    /// Encode a version the way browser target tables expect: `major << 16 | minor << 8`.
    pub fn encode(version: &str) -> Option<u32> {
        let mut parts = version.trim().split('.');
        let major: u32 = parts.next()?.parse().ok()?;
        let minor: u32 = parts.next().map_or(Some(0), |m| m.parse().ok())?;
        Some((major << 16) | (minor << 8))
    }

    fn validate(&self, diag: &mut ConfigDiagnostics) {
        for (name, version) in [
            ("chrome", &self.chrome),
            ("firefox", &self.firefox),
            ("safari", &self.safari),
        ] {
            if let Some(version) = version
                && Self::encode(version).is_none()
            {
                diag.error(
                    format!("build.targets.{name}"),
                    format!("invalid browser version `{version}`"),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_build_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.build.output, PathBuf::from("dist"));
        assert_eq!(config.build.inline_limit, 4096);
        assert_eq!(config.build.script_target, "es2020");
        assert_eq!(
            config.build.entries.get("index"),
            Some(&PathBuf::from("./src/index.tsx"))
        );
    }

    #[test]
    fn test_public_path_follows_mode() {
        let config = test_parse_config("");
        assert_eq!(config.build.public_path(BuildMode::Development), "/");
        assert_eq!(config.build.public_path(BuildMode::Production), "./");

        let config = test_parse_config("[build]\npublic_path = \"/app\"");
        assert_eq!(config.build.public_path(BuildMode::Production), "/app/");
    }

    #[test]
    fn test_minify_follows_mode() {
        let config = test_parse_config("");
        assert!(config.build.minify(BuildMode::Production));
        assert!(!config.build.minify(BuildMode::Development));

        let config = test_parse_config("[build]\nminify = false");
        assert!(!config.build.minify(BuildMode::Production));
    }

    #[test]
    fn test_entries_override() {
        let config = test_parse_config("[build.entries]\nmain = \"./src/main.ts\"");
        assert_eq!(config.build.entries.len(), 1);
        assert!(config.build.entries.contains_key("main"));
    }

    #[test]
    fn test_target_encode() {
        assert_eq!(TargetsConfig::encode("100"), Some(100 << 16));
        assert_eq!(TargetsConfig::encode("14.1"), Some((14 << 16) | (1 << 8)));
        assert_eq!(TargetsConfig::encode("latest"), None);
    }

    #[test]
    fn test_validate_rejects_bad_entry_name() {
        let config = test_parse_config("[build.entries]\n\"a/b\" = \"./src/x.ts\"");
        let mut diag = ConfigDiagnostics::new();
        config.build.validate(&mut diag);
        assert!(diag.has_errors());
    }
}
