//! Build mode for production/development builds.

use serde::{Deserialize, Serialize};

/// Build mode, fixed for the duration of one build invocation.
///
/// Passed by value into every component instead of living in global state,
/// so a development and a production pipeline can coexist in one process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    /// Watch-and-serve builds: readable names, live-reload instrumentation.
    Development,
    /// One-shot builds: hashed names, minified output.
    Production,
}

impl BuildMode {
    /// Check if this is development mode.
    #[inline]
    pub const fn is_dev(self) -> bool {
        matches!(self, Self::Development)
    }

    /// Whether output file names carry a content hash.
    #[inline]
    pub const fn hashed_names(self) -> bool {
        matches!(self, Self::Production)
    }

    /// Value of `NODE_ENV` / `import.meta.env.MODE` for this mode.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

impl std::fmt::Display for BuildMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_flags() {
        assert!(BuildMode::Development.is_dev());
        assert!(!BuildMode::Production.is_dev());
        assert!(BuildMode::Production.hashed_names());
        assert!(!BuildMode::Development.hashed_names());
    }

    #[test]
    fn test_mode_name() {
        assert_eq!(BuildMode::Development.to_string(), "development");
        assert_eq!(BuildMode::Production.name(), "production");
    }
}
