//! `[check]` section configuration.
//!
//! ```toml
//! [check]
//! enable = true               # Advisory syntax and scope checks
//! exclude = ["node_modules"]  # Path substrings that are never checked
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    pub enable: bool,
    pub exclude: Vec<String>,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            enable: true,
            exclude: vec!["node_modules".into()],
        }
    }
}

impl CheckConfig {
    pub fn is_excluded(&self, path: &str) -> bool {
        self.exclude.iter().any(|pattern| path.contains(pattern.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use crate::config::test_parse_config;

    #[test]
    fn test_check_defaults() {
        let config = test_parse_config("");
        assert!(config.check.enable);
        assert!(config.check.is_excluded("/p/node_modules/react/index.js"));
        assert!(!config.check.is_excluded("/p/src/index.tsx"));
    }
}
