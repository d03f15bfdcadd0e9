//! Assign every module of a complete graph to exactly one chunk.
//!
//! Entries are walked in name order. The first entry to reach a module owns
//! it. Script modules go to their cache group, or to the owning entry's
//! chunk when no group matches. Every other module follows the chunk of the
//! module that first imported it, so a stylesheet imported by a vendor
//! package travels with that package.

use std::collections::BTreeMap;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use super::policy::ChunkPolicy;
use crate::core::AssetCategory;
use crate::graph::ModuleGraph;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    pub name: String,
    /// Module ids, dependencies before dependents.
    pub modules: Vec<String>,
    /// Entry module started by this chunk, for entry chunks only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,
}

/// A module reached from several entries that landed in one entry's chunk.
/// Pages of the other entries load that chunk as a shared dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkingConflict {
    pub module: String,
    pub entries: Vec<String>,
    pub chunk: String,
}

impl std::fmt::Display for ChunkingConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} is shared by entries {}, placed in chunk `{}`",
            self.module,
            self.entries.join(", "),
            self.chunk
        )
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ChunkPlan {
    pub chunks: BTreeMap<String, Chunk>,
    /// Module id -> chunk name.
    pub assignment: BTreeMap<String, String>,
    /// Entry name -> chunks its page loads, the entry's own chunk last.
    pub entry_chunks: BTreeMap<String, Vec<String>>,
    pub conflicts: Vec<ChunkingConflict>,
}

impl ChunkPlan {
    pub fn chunk_of(&self, id: &str) -> Option<&str> {
        self.assignment.get(id).map(String::as_str)
    }
}

/// Where a module was first seen.
struct Origin<'g> {
    parent: Option<&'g str>,
    entry: &'g str,
}

pub fn plan_chunks(graph: &ModuleGraph, policy: &ChunkPolicy) -> ChunkPlan {
    let mut plan = ChunkPlan::default();
    let mut origins: FxHashMap<&str, Origin<'_>> = FxHashMap::default();
    let mut first_seen: Vec<&str> = Vec::new();
    let mut reached_by: FxHashMap<&str, Vec<&str>> = FxHashMap::default();

    for (entry, root) in &graph.entries {
        for (id, parent) in pre_order(graph, root) {
            reached_by.entry(id).or_default().push(entry.as_str());
            origins.entry(id).or_insert_with(|| {
                first_seen.push(id);
                Origin { parent, entry: entry.as_str() }
            });
        }
    }

    // Parents are always seen before their children.
    for &id in &first_seen {
        let Some(record) = graph.get(id) else { continue };
        let origin = &origins[id];
        let is_entry_root = graph.entries.get(origin.entry).is_some_and(|root| root == id);
        let chunk = if is_entry_root {
            origin.entry.to_string()
        } else if record.category == AssetCategory::Script {
            policy.assign(record.path.as_deref(), origin.entry).to_string()
        } else {
            origin
                .parent
                .and_then(|p| plan.assignment.get(p).cloned())
                .unwrap_or_else(|| origin.entry.to_string())
        };
        plan.assignment.insert(id.to_string(), chunk);
    }

    let mut visited = FxHashSet::default();
    for (entry, root) in &graph.entries {
        for id in graph.post_order(root, &mut visited) {
            let Some(name) = plan.assignment.get(id) else { continue };
            plan.chunks
                .entry(name.clone())
                .or_insert_with(|| Chunk {
                    name: name.clone(),
                    modules: Vec::new(),
                    entry: None,
                })
                .modules
                .push(id.to_string());
        }
        if let Some(chunk) = plan.chunks.get_mut(entry) {
            chunk.entry = Some(root.clone());
        }
    }

    for (entry, root) in &graph.entries {
        let mut names: Vec<String> = pre_order(graph, root)
            .into_iter()
            .filter_map(|(id, _)| plan.assignment.get(id).cloned())
            .filter(|name| name != entry)
            .collect();
        names.sort();
        names.dedup();
        names.push(entry.clone());
        plan.entry_chunks.insert(entry.clone(), names);
    }

    for &id in &first_seen {
        let entries = &reached_by[id];
        let chunk = &plan.assignment[id];
        if entries.len() > 1 && graph.entries.contains_key(chunk) {
            plan.conflicts.push(ChunkingConflict {
                module: id.to_string(),
                entries: entries.iter().map(|e| e.to_string()).collect(),
                chunk: chunk.clone(),
            });
        }
    }

    plan
}

/// Modules reachable from `root` in import order, each with the module
/// that first imported it.
fn pre_order<'g>(graph: &'g ModuleGraph, root: &str) -> Vec<(&'g str, Option<&'g str>)> {
    let mut order = Vec::new();
    let Some((root, _)) = graph.modules.get_key_value(root) else {
        return order;
    };
    let mut seen: FxHashSet<&str> = FxHashSet::default();
    let mut stack: Vec<(&'g str, Option<&'g str>)> = vec![(root.as_str(), None)];

    while let Some((id, parent)) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        order.push((id, parent));
        let Some(record) = graph.get(id) else { continue };
        let children: Vec<&'g str> = record
            .dep_ids()
            .filter_map(|dep| graph.modules.get_key_value(dep).map(|(k, _)| k.as_str()))
            .collect();
        for child in children.into_iter().rev() {
            if !seen.contains(child) {
                stack.push((child, Some(id)));
            }
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use super::*;
    use crate::config::section::default_chunk_groups;
    use crate::graph::ModuleRecord;
    use crate::transform::{DepKind, DepRequest, ModuleOutput};

    fn record(id: &str, category: AssetCategory, deps: &[(&str, &str)]) -> ModuleRecord {
        let output = ModuleOutput {
            requests: deps
                .iter()
                .map(|(spec, _)| DepRequest::new(*spec, DepKind::Import))
                .collect(),
            ..ModuleOutput::default()
        };
        ModuleRecord {
            id: id.to_string(),
            path: Some(PathBuf::from(format!("/p/{id}"))),
            category,
            output: Arc::new(output),
            deps: deps
                .iter()
                .map(|(spec, dep)| (spec.to_string(), dep.to_string()))
                .collect(),
            failed: false,
        }
    }

    fn graph(records: Vec<ModuleRecord>, entries: &[(&str, &str)]) -> ModuleGraph {
        ModuleGraph {
            modules: records.into_iter().map(|r| (r.id.clone(), r)).collect(),
            entries: entries
                .iter()
                .map(|(name, id)| (name.to_string(), id.to_string()))
                .collect(),
        }
    }

    fn policy() -> ChunkPolicy {
        ChunkPolicy::from_config(&default_chunk_groups()).unwrap()
    }

    const REACT: &str = "node_modules/react/index.js";

    fn two_entry_graph() -> ModuleGraph {
        use AssetCategory::{Image, Script, Style};
        graph(
            vec![
                record(
                    "src/index.tsx",
                    Script,
                    &[("react", REACT), ("./a.css", "src/a.css"), ("./util", "src/util.ts")],
                ),
                record("src/admin.tsx", Script, &[("react", REACT), ("./util", "src/util.ts")]),
                record(REACT, Script, &[("./lib.css", "node_modules/react/lib.css")]),
                record("node_modules/react/lib.css", Style, &[]),
                record("src/a.css", Style, &[("./bg.png", "src/bg.png")]),
                record("src/bg.png", Image, &[]),
                record("src/util.ts", Script, &[]),
            ],
            &[("index", "src/index.tsx"), ("admin", "src/admin.tsx")],
        )
    }

    #[test]
    fn test_react_lands_in_group_for_both_entries() {
        let plan = plan_chunks(&two_entry_graph(), &policy());
        assert_eq!(plan.chunk_of(REACT), Some("lib-react"));
        assert!(plan.entry_chunks["index"].contains(&"lib-react".to_string()));
        assert!(plan.entry_chunks["admin"].contains(&"lib-react".to_string()));
    }

    #[test]
    fn test_every_module_in_exactly_one_chunk() {
        let graph = two_entry_graph();
        let plan = plan_chunks(&graph, &policy());
        for id in graph.modules.keys() {
            let holders: Vec<_> = plan
                .chunks
                .values()
                .filter(|c| c.modules.contains(id))
                .map(|c| c.name.as_str())
                .collect();
            assert_eq!(holders.len(), 1, "{id} is in {holders:?}");
            assert_eq!(plan.chunk_of(id), Some(holders[0]));
        }
    }

    #[test]
    fn test_non_scripts_follow_first_importer() {
        let plan = plan_chunks(&two_entry_graph(), &policy());
        assert_eq!(plan.chunk_of("node_modules/react/lib.css"), Some("lib-react"));
        assert_eq!(plan.chunk_of("src/a.css"), Some("index"));
        assert_eq!(plan.chunk_of("src/bg.png"), Some("index"));
    }

    #[test]
    fn test_first_entry_owns_shared_module() {
        // `admin` sorts before `index`, so it reaches util.ts first.
        let plan = plan_chunks(&two_entry_graph(), &policy());
        assert_eq!(plan.chunk_of("src/util.ts"), Some("admin"));
        assert_eq!(plan.entry_chunks["index"], vec!["admin", "lib-react", "index"]);
        assert_eq!(plan.entry_chunks["admin"], vec!["lib-react", "admin"]);
        assert_eq!(plan.conflicts.len(), 1);
        assert_eq!(plan.conflicts[0].module, "src/util.ts");
        assert_eq!(plan.conflicts[0].entries, vec!["admin", "index"]);
    }

    #[test]
    fn test_entry_chunk_records_entry_and_dependency_order() {
        let plan = plan_chunks(&two_entry_graph(), &policy());
        let index = &plan.chunks["index"];
        assert_eq!(index.entry.as_deref(), Some("src/index.tsx"));
        assert_eq!(index.modules.last().map(String::as_str), Some("src/index.tsx"));
        let css = index.modules.iter().position(|m| m == "src/a.css").unwrap();
        let png = index.modules.iter().position(|m| m == "src/bg.png").unwrap();
        assert!(png < css);
        assert!(plan.chunks["lib-react"].entry.is_none());
    }

    #[test]
    fn test_entry_root_never_grouped() {
        let graph = graph(
            vec![record("node_modules/react/index.js", AssetCategory::Script, &[])],
            &[("index", "node_modules/react/index.js")],
        );
        let plan = plan_chunks(&graph, &policy());
        assert_eq!(plan.chunk_of("node_modules/react/index.js"), Some("index"));
        assert!(plan.conflicts.is_empty());
    }
}
