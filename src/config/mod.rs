//! Project configuration from `rivet.toml`.
//!
//! ```text
//! config/
//! ├── section/   # [build] [html] [resolve] [[chunks]] [check] [serve]
//! ├── error.rs   # ConfigError, ConfigDiagnostics
//! └── mod.rs     # ProjectConfig (this file)
//! ```
//!
//! The file is searched upward from the working directory; its parent
//! becomes the project root. Without a file the working directory is the
//! root and every section takes its defaults. CLI flags override the file.

mod error;
pub mod section;

pub use error::{ConfigDiagnostics, ConfigError};
pub use section::{
    BuildConfig, CheckConfig, ChunkGroupConfig, Fallback, HtmlConfig, ResolveConfig, ServeConfig,
    TargetsConfig,
};

use crate::cli::{BuildArgs, Cli, Commands};
use crate::log;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure representing `rivet.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub html: HtmlConfig,

    #[serde(default)]
    pub resolve: ResolveConfig,

    /// Cache groups for vendor chunks
    #[serde(default = "section::default_chunk_groups")]
    pub chunks: Vec<ChunkGroupConfig>,

    /// Extra compile-time tokens: `"__APP_VERSION__" = "1.2.0"`
    #[serde(default)]
    pub define: BTreeMap<String, serde_json::Value>,

    #[serde(default)]
    pub check: CheckConfig,

    #[serde(default)]
    pub serve: ServeConfig,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            root: PathBuf::new(),
            build: BuildConfig::default(),
            html: HtmlConfig::default(),
            resolve: ResolveConfig::default(),
            chunks: section::default_chunk_groups(),
            define: BTreeMap::new(),
            check: CheckConfig::default(),
            serve: ServeConfig::default(),
        }
    }
}

impl ProjectConfig {
    /// Load configuration for a CLI invocation.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let mut config = match find_config_file(&cwd, &cli.config) {
            Some(path) => {
                let mut config = Self::from_path(&path)?;
                config.config_path = crate::utils::path::normalize_path(&path);
                config
            }
            None => {
                crate::debug!("config"; "no {} found, using defaults", cli.config.display());
                Self::default()
            }
        };

        let root = config
            .config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or(cwd);

        Self::update_option(&mut config.build.output, cli.output.as_ref());
        config.apply_command_options(cli);
        config.set_root(&root);
        config.validate()?;

        Ok(config)
    }

    /// Default configuration rooted at `root`, for embedding and tests.
    pub fn with_root(root: &Path) -> Self {
        let mut config = Self::default();
        config.set_root(root);
        config
    }

    /// Parse a configuration from TOML text and root it at `root`.
    pub fn parse(content: &str, root: &Path) -> Result<Self> {
        let (mut config, ignored) = Self::parse_with_ignored(content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, Path::new("rivet.toml"));
        }
        config.set_root(root);
        config.validate()?;
        Ok(config)
    }

    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warn"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {field}");
        }
    }

    /// Set the project root and make output paths absolute.
    fn set_root(&mut self, root: &Path) {
        let root = crate::utils::path::normalize_path(root);
        self.build.output = root.join(&self.build.output);
        self.root = root;
    }

    pub fn root_join(&self, path: impl AsRef<Path>) -> PathBuf {
        crate::utils::path::clean(&self.root.join(path))
    }

    pub fn output_dir(&self) -> &Path {
        &self.build.output
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    fn apply_command_options(&mut self, cli: &Cli) {
        match &cli.command {
            Commands::Build { build_args } => self.apply_build_args(build_args),
            Commands::Serve {
                build_args,
                interface,
                port,
                watch,
            } => {
                self.apply_build_args(build_args);
                Self::update_option(&mut self.serve.interface, interface.as_ref());
                Self::update_option(&mut self.serve.port, port.as_ref());
                Self::update_option(&mut self.serve.watch, watch.as_ref());
            }
            Commands::Inspect { .. } => {}
        }
    }

    fn apply_build_args(&mut self, args: &BuildArgs) {
        crate::logger::set_verbose(args.verbose);

        if args.minify.is_some() {
            self.build.minify = args.minify;
        }
        Self::update_option(&mut self.check.enable, args.check.as_ref());
        self.build.clean = args.clean;
    }

    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate all sections, collecting every error before failing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut diag = ConfigDiagnostics::new();

        self.build.validate(&mut diag);
        self.resolve.validate(&mut diag);
        self.serve.validate(&mut diag);
        section::validate_chunk_groups(&self.chunks, &mut diag);

        for group in &self.chunks {
            if self.build.entries.contains_key(&group.name) {
                diag.error_with_hint(
                    "chunks",
                    format!("chunk group `{}` shares its name with an entry", group.name),
                    "entry names are chunk names too",
                );
            }
        }

        for name in &self.html.chunks {
            if !self.build.entries.contains_key(name) {
                diag.error_with_hint(
                    "html.chunks",
                    format!("unknown entry `{name}`"),
                    "list names declared in [build.entries]",
                );
            }
        }
        for token in self.define.keys() {
            if token.is_empty() || token.chars().any(char::is_whitespace) {
                diag.error("define", format!("invalid token `{token}`"));
            }
        }

        diag.into_result().map_err(ConfigError::Diagnostics)
    }
}

/// Search `name` in `start` and its ancestors.
fn find_config_file(start: &Path, name: &Path) -> Option<PathBuf> {
    if name.is_absolute() {
        return name.exists().then(|| name.to_path_buf());
    }
    start
        .ancestors()
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// Parse config text and panic on unknown fields (catches typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> ProjectConfig {
    let (parsed, ignored) = ProjectConfig::parse_with_ignored(content).unwrap();
    assert!(ignored.is_empty(), "test config has unknown fields: {:?}", ignored);
    parsed
}
