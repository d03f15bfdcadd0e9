//! Cache groups: which chunk a script module belongs to.

use std::path::Path;

use regex::Regex;

use crate::config::ChunkGroupConfig;
use crate::utils::path::slash;

/// A compiled `[[chunks]]` entry.
#[derive(Debug, Clone)]
pub struct ChunkGroup {
    pub name: String,
    pub test: Regex,
    pub priority: i32,
}

/// Ordered cache groups. Higher priority wins; equal priorities keep
/// declaration order.
#[derive(Debug, Clone, Default)]
pub struct ChunkPolicy {
    groups: Vec<ChunkGroup>,
}

impl ChunkPolicy {
    pub fn from_config(groups: &[ChunkGroupConfig]) -> Result<Self, regex::Error> {
        let mut compiled = groups
            .iter()
            .map(|g| {
                Ok(ChunkGroup {
                    name: g.name.clone(),
                    test: Regex::new(&g.test)?,
                    priority: g.priority,
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;
        // stable: ties stay in declaration order
        compiled.sort_by_key(|g| std::cmp::Reverse(g.priority));
        Ok(Self { groups: compiled })
    }

    pub fn groups(&self) -> &[ChunkGroup] {
        &self.groups
    }

    /// First group whose test matches the forward-slash path.
    pub fn group_for(&self, module_path: &Path) -> Option<&str> {
        let path = slash(module_path);
        self.groups
            .iter()
            .find(|g| g.test.is_match(&path))
            .map(|g| g.name.as_str())
    }

    /// Chunk for a script module first reached from `entry`.
    pub fn assign<'a>(&'a self, module_path: Option<&Path>, entry: &'a str) -> &'a str {
        module_path
            .and_then(|path| self.group_for(path))
            .unwrap_or(entry)
    }
}
