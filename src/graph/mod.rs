//! Module graph discovery.
//!
//! The graph grows in waves: every module of the current frontier runs its
//! chain on the rayon pool, and the specifiers it requests become the next
//! frontier. Results are merged in frontier order, so the graph is the
//! same whatever order the workers finish in.
//!
//! ```text
//! wave 0   src/index.tsx
//! wave 1   src/app/App.tsx  src/app.css  node_modules/react/index.js
//! wave 2   src/logo.svg#component  node_modules/react/cjs/react.development.js
//! ```

mod resolve;

pub use resolve::{Resolved, Resolver};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::classify::{Classifier, Request};
use crate::core::AssetCategory;
use crate::logger::ProgressLine;
use crate::output::ContentHash;
use crate::transform::{
    AssetSource, CancelToken, ChainContext, DepKind, FailedAt, ModuleOutput, RunError,
    TransformContext, TransformError, build_chain, parse_data_uri, run_chain,
};
use crate::utils::path::{clean, relative_slash};

/// One compiled module.
#[derive(Debug, Clone)]
pub struct ModuleRecord {
    pub id: String,
    /// Source file; `data:` URIs and empty modules have none.
    pub path: Option<PathBuf>,
    pub category: AssetCategory,
    pub output: Arc<ModuleOutput>,
    /// Specifier as written -> module id.
    pub deps: BTreeMap<String, String>,
    /// The chain failed; `output` throws when evaluated.
    pub failed: bool,
}

impl ModuleRecord {
    /// Dependency ids in request order.
    pub fn dep_ids(&self) -> impl Iterator<Item = &str> {
        self.output
            .requests
            .iter()
            .filter_map(|r| self.deps.get(&r.specifier))
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ModuleGraph {
    pub modules: BTreeMap<String, ModuleRecord>,
    /// Entry name -> module id.
    pub entries: BTreeMap<String, String>,
}

impl ModuleGraph {
    pub fn get(&self, id: &str) -> Option<&ModuleRecord> {
        self.modules.get(id)
    }

    /// Modules reachable from `start`, dependencies before dependents.
    ///
    /// `visited` is shared across calls so several entries can be walked
    /// without repeating modules.
    pub fn post_order<'g>(&'g self, start: &str, visited: &mut FxHashSet<&'g str>) -> Vec<&'g str> {
        let mut order = Vec::new();
        let Some((start, _)) = self.modules.get_key_value(start) else {
            return order;
        };
        if !visited.insert(start.as_str()) {
            return order;
        }

        let mut stack: Vec<(&'g str, Vec<&'g str>)> = vec![(start.as_str(), self.children(start))];
        while let Some((node, pending)) = stack.last_mut() {
            match pending.pop() {
                Some(child) => {
                    if visited.insert(child) {
                        let grandchildren = self.children(child);
                        stack.push((child, grandchildren));
                    }
                }
                None => {
                    order.push(*node);
                    stack.pop();
                }
            }
        }
        order
    }

    /// Children reversed, so popping yields request order.
    fn children<'g>(&'g self, id: &str) -> Vec<&'g str> {
        let mut ids: Vec<&'g str> = self
            .modules
            .get(id)
            .map(|m| {
                m.dep_ids()
                    .filter_map(|dep| self.modules.get_key_value(dep).map(|(k, _)| k.as_str()))
                    .collect()
            })
            .unwrap_or_default();
        ids.reverse();
        ids
    }
}

/// Non-fatal findings from graph discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum GraphWarning {
    /// No rule matched; emitted as an opaque file.
    ClassificationAmbiguity { id: String },
    /// A `require()` or CSS `url()` that does not resolve; left as written.
    Unresolved { from: String, specifier: String },
}

impl std::fmt::Display for GraphWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ClassificationAmbiguity { id } => {
                write!(f, "{id}: no rule matches, emitted as an opaque file")
            }
            Self::Unresolved { from, specifier } => {
                write!(f, "{from}: cannot resolve `{specifier}`, left as written")
            }
        }
    }
}

/// Compiled modules keyed by id, reused while the source bytes match.
#[derive(Default)]
pub struct ModuleCache {
    entries: DashMap<String, (ContentHash, Arc<ModuleOutput>)>,
}

impl ModuleCache {
    pub fn get(&self, id: &str, source: ContentHash) -> Option<Arc<ModuleOutput>> {
        self.entries
            .get(id)
            .filter(|entry| entry.0 == source)
            .map(|entry| Arc::clone(&entry.1))
    }

    pub fn insert(&self, id: &str, source: ContentHash, output: Arc<ModuleOutput>) {
        self.entries.insert(id.to_string(), (source, output));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Everything a wave worker needs.
pub struct GraphEnv<'a> {
    pub root: &'a Path,
    pub classifier: &'a Classifier,
    pub resolver: &'a Resolver,
    pub ctx: &'a TransformContext<'a>,
    pub cache: &'a ModuleCache,
    /// Per-file tokens of chains currently running.
    pub inflight: &'a DashMap<PathBuf, CancelToken>,
    /// Build-wide token; cancelling it stops every chain not yet started.
    pub cancel: &'a CancelToken,
    pub minify: bool,
    pub progress: Option<&'a ProgressLine>,
}

#[derive(Debug, Default)]
pub struct GraphOutcome {
    pub graph: ModuleGraph,
    pub errors: Vec<TransformError>,
    pub warnings: Vec<GraphWarning>,
    pub reused: usize,
}

/// A file changed while its chain was running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Superseded;

/// A request waiting for its chain.
#[derive(Debug, Clone)]
struct Pending {
    id: String,
    req: Request,
    category: AssetCategory,
    source: PendingSource,
}

#[derive(Debug, Clone)]
enum PendingSource {
    File,
    Data(String),
    Empty,
}

struct Done {
    record: ModuleRecord,
    children: Vec<Pending>,
    errors: Vec<TransformError>,
    warnings: Vec<GraphWarning>,
    reused: bool,
}

pub fn build_graph(
    env: &GraphEnv<'_>,
    entries: &BTreeMap<String, PathBuf>,
) -> Result<GraphOutcome, Superseded> {
    let mut outcome = GraphOutcome::default();
    let mut queued: FxHashSet<String> = FxHashSet::default();
    let mut frontier = Vec::new();

    for (name, path) in entries {
        let path = clean(&env.root.join(path));
        let pending = file_pending(env, Request::new(path));
        outcome.graph.entries.insert(name.clone(), pending.id.clone());
        if queued.insert(pending.id.clone()) {
            discover(env, &pending);
            frontier.push(pending);
        }
    }

    while !frontier.is_empty() {
        let results: Vec<Result<Done, Superseded>> =
            frontier.into_par_iter().map(|p| compile(env, p)).collect();

        let mut next = Vec::new();
        let mut superseded = false;
        for result in results {
            let Ok(done) = result else {
                superseded = true;
                continue;
            };
            for child in done.children {
                if queued.insert(child.id.clone()) {
                    discover(env, &child);
                    next.push(child);
                }
            }
            outcome.errors.extend(done.errors);
            outcome.warnings.extend(done.warnings);
            outcome.reused += usize::from(done.reused);
            if let Some(progress) = env.progress {
                progress.inc(done.record.category.name());
            }
            outcome.graph.modules.insert(done.record.id.clone(), done.record);
        }
        if superseded {
            return Err(Superseded);
        }
        frontier = next;
    }

    outcome.errors.sort_by(|a, b| a.path.cmp(&b.path));
    outcome.warnings.sort_by_key(|w| w.to_string());
    Ok(outcome)
}

fn discover(env: &GraphEnv<'_>, pending: &Pending) {
    if let Some(progress) = env.progress {
        progress.discover(pending.category.name(), 1);
    }
}

/// Module id: root-relative path, `?query` when present, and the variant
/// name when the variant depends on the importer.
fn module_id(env: &GraphEnv<'_>, req: &Request, base: String) -> (String, AssetCategory) {
    let class = env.classifier.classify(req);
    let mut id = base;
    if !req.query.is_empty() {
        id.push('?');
        id.push_str(&req.query);
    }
    if class.variant.condition.depends_on_issuer() {
        id.push('#');
        id.push_str(&class.variant.name);
    }
    (id, class.category)
}

fn file_pending(env: &GraphEnv<'_>, req: Request) -> Pending {
    let base = relative_slash(&req.path, env.root);
    let (id, category) = module_id(env, &req, base);
    Pending {
        id,
        req,
        category,
        source: PendingSource::File,
    }
}

fn compile(env: &GraphEnv<'_>, pending: Pending) -> Result<Done, Superseded> {
    if env.cancel.is_cancelled() {
        return Err(Superseded);
    }
    let id = pending.id.clone();
    let bytes = match &pending.source {
        PendingSource::Empty => return Ok(empty_module(id)),
        PendingSource::Data(uri) => match parse_data_uri(uri) {
            Some(data) => data.bytes,
            None => {
                let err = TransformError {
                    path: id.clone(),
                    stage: FailedAt::Read,
                    message: "malformed data URI".to_string(),
                };
                return Ok(failed_module(&pending, err));
            }
        },
        PendingSource::File => match std::fs::read(&pending.req.path) {
            Ok(bytes) => bytes,
            Err(err) => return Ok(failed_module(&pending, TransformError::read(&id, &err))),
        },
    };

    let class = env.classifier.classify(&pending.req);
    let mut warnings = Vec::new();
    if class.ambiguous {
        warnings.push(GraphWarning::ClassificationAmbiguity { id: id.clone() });
    }

    let source_hash = ContentHash::of(&bytes);
    let cached = env.cache.get(&id, source_hash);
    let reused = cached.is_some();
    let output = match cached {
        Some(output) => output,
        None => {
            let chain_ctx = ChainContext {
                path: &pending.req.path,
                query: &pending.req.query,
                minify: env.minify,
                script_target: env.ctx.script_target,
            };
            let chain = match build_chain(class.category, class.variant, env.ctx.mode, &chain_ctx) {
                Ok(chain) => chain,
                Err(err) => {
                    let err = TransformError {
                        path: id.clone(),
                        stage: FailedAt::Chain,
                        message: err.to_string(),
                    };
                    return Ok(failed_module(&pending, err));
                }
            };

            // Chains over one file share its token, so a path cancel reaches all of them.
            let tracked = matches!(pending.source, PendingSource::File);
            let token = if tracked {
                env.inflight
                    .entry(pending.req.path.clone())
                    .or_default()
                    .value()
                    .clone()
            } else {
                CancelToken::new()
            };
            let source = AssetSource {
                id: &id,
                path: &pending.req.path,
                query: &pending.req.query,
                category: class.category,
                mime: pending.req.mime.as_deref(),
                bytes,
            };
            let result = run_chain(&chain, source, env.ctx, &token);
            if tracked {
                env.inflight.remove(&pending.req.path);
            }
            match result {
                Ok(output) => {
                    let output = Arc::new(output);
                    env.cache.insert(&id, source_hash, Arc::clone(&output));
                    output
                }
                Err(RunError::Cancelled) => return Err(Superseded),
                Err(RunError::Failed(err)) => return Ok(failed_module(&pending, err)),
            }
        }
    };

    let mut done = Done {
        record: ModuleRecord {
            id: id.clone(),
            path: matches!(pending.source, PendingSource::File).then(|| pending.req.path.clone()),
            category: class.category,
            output: Arc::clone(&output),
            deps: BTreeMap::new(),
            failed: false,
        },
        children: Vec::new(),
        errors: Vec::new(),
        warnings,
        reused,
    };
    resolve_requests(env, &pending, &output, &mut done);
    Ok(done)
}

fn resolve_requests(env: &GraphEnv<'_>, pending: &Pending, output: &ModuleOutput, done: &mut Done) {
    let from_dir = match pending.source {
        PendingSource::File => pending.req.path.parent().unwrap_or(env.root),
        _ => env.root,
    };

    for request in &output.requests {
        match env.resolver.resolve(&request.specifier, from_dir) {
            Ok(resolved) => {
                let child = child_pending(env, &pending.req.path, resolved);
                done.record.deps.insert(request.specifier.clone(), child.id.clone());
                done.children.push(child);
            }
            Err(err) => match request.kind {
                DepKind::Import | DepKind::CssImport => {
                    done.errors.push(TransformError::resolve(&pending.id, err.to_string()));
                }
                DepKind::Require | DepKind::CssUrl => {
                    done.warnings.push(GraphWarning::Unresolved {
                        from: pending.id.clone(),
                        specifier: request.specifier.clone(),
                    });
                }
            },
        }
    }
}

fn child_pending(env: &GraphEnv<'_>, issuer: &Path, resolved: Resolved) -> Pending {
    match resolved {
        Resolved::File { path, query } => {
            file_pending(env, Request::new(path).with_query(&query).with_issuer(issuer))
        }
        Resolved::DataUri(uri) => {
            let mime = parse_data_uri(&uri).map_or_else(|| "text/plain".to_string(), |d| d.mime);
            let req = Request::new(format!("data:{mime}"))
                .with_mime(&mime)
                .with_issuer(issuer);
            let base = format!("data:{}", ContentHash::of(uri.as_bytes()).short());
            let (id, category) = module_id(env, &req, base);
            Pending {
                id,
                req,
                category,
                source: PendingSource::Data(uri),
            }
        }
        Resolved::Empty(name) => Pending {
            id: format!("empty:{name}"),
            req: Request::new(format!("empty:{name}")),
            category: AssetCategory::Script,
            source: PendingSource::Empty,
        },
    }
}

fn empty_module(id: String) -> Done {
    Done {
        record: ModuleRecord {
            id,
            path: None,
            category: AssetCategory::Script,
            output: Arc::new(ModuleOutput::default()),
            deps: BTreeMap::new(),
            failed: false,
        },
        children: Vec::new(),
        errors: Vec::new(),
        warnings: Vec::new(),
        reused: false,
    }
}

/// Record for a file whose chain failed. Evaluating it throws, so the
/// page reports the failure instead of a missing module.
fn failed_module(pending: &Pending, err: TransformError) -> Done {
    let message = serde_json::Value::String(format!("rivet: {err}")).to_string();
    Done {
        record: ModuleRecord {
            id: pending.id.clone(),
            path: matches!(pending.source, PendingSource::File).then(|| pending.req.path.clone()),
            category: pending.category,
            output: Arc::new(ModuleOutput::with_code(format!("throw new Error({message});\n"))),
            deps: BTreeMap::new(),
            failed: true,
        },
        children: Vec::new(),
        errors: vec![err],
        warnings: Vec::new(),
        reused: false,
    }
}
