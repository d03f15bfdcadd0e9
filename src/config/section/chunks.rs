//! `[[chunks]]` cache groups.
//!
//! ```toml
//! [[chunks]]
//! name = "lib-react"
//! test = 'node_modules[\\/](react|react-dom|scheduler)[\\/]'
//! priority = 0
//! ```
//!
//! Declaring any group replaces the defaults.

use serde::{Deserialize, Serialize};

use crate::config::ConfigDiagnostics;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkGroupConfig {
    pub name: String,
    /// Regex over the forward-slash module path.
    pub test: String,
    #[serde(default)]
    pub priority: i32,
}

impl ChunkGroupConfig {
    fn new(name: &str, test: &str) -> Self {
        Self {
            name: name.into(),
            test: test.into(),
            priority: 0,
        }
    }
}

pub fn default_chunk_groups() -> Vec<ChunkGroupConfig> {
    vec![
        ChunkGroupConfig::new("lib-axios", r"node_modules[\\/]axios(-.+)?[\\/]"),
        ChunkGroupConfig::new(
            "lib-react",
            r"node_modules[\\/](?:react|react-dom|scheduler|react-refresh|@rspack[\\/]plugin-react-refresh)[\\/]",
        ),
        ChunkGroupConfig::new(
            "lib-router",
            r"node_modules[\\/](?:react-router|react-router-dom|history|@remix-run[\\/]router)[\\/]",
        ),
    ]
}

pub fn validate_chunk_groups(groups: &[ChunkGroupConfig], diag: &mut ConfigDiagnostics) {
    for (i, group) in groups.iter().enumerate() {
        if group.name.is_empty() {
            diag.error(format!("chunks[{i}].name"), "chunk name must not be empty");
        }
        if let Err(e) = regex::Regex::new(&group.test) {
            diag.error(format!("chunks[{i}].test"), format!("invalid regex: {e}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_default_groups() {
        let config = test_parse_config("");
        let names: Vec<_> = config.chunks.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, ["lib-axios", "lib-react", "lib-router"]);
        assert!(config.chunks.iter().all(|g| g.priority == 0));
    }

    #[test]
    fn test_user_groups_replace_defaults() {
        let config = test_parse_config(
            "[[chunks]]\nname = \"vendor\"\ntest = \"node_modules\"\npriority = -10",
        );
        assert_eq!(config.chunks.len(), 1);
        assert_eq!(config.chunks[0].priority, -10);
    }

    #[test]
    fn test_invalid_regex_reported() {
        let groups = vec![ChunkGroupConfig::new("bad", "(")];
        let mut diag = ConfigDiagnostics::new();
        validate_chunk_groups(&groups, &mut diag);
        assert!(diag.has_errors());
    }
}
