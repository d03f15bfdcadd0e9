//! Build orchestration.
//!
//! ```text
//! bindings ─┐
//!           ▼
//! entries ─► graph waves (rayon) ─► chunk plan ─► chunk files ─┐
//!               │                                               ├─► dedupe ─► dist/
//!               └─► resource artifacts ─────────────────────────┘
//! ```
//!
//! A [`Pipeline`] lives as long as the process. Its module cache carries
//! compiled modules from one build to the next, so a watch rebuild only
//! reruns chains whose source bytes changed.

mod html;
mod report;
mod write;

pub use report::{BuildError, BuildOutcome, BuildReport, print_diagnostics};

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use lightningcss::targets::Targets;
use parking_lot::Mutex;

use crate::chunk::{ChunkPolicy, emit_chunks, plan_chunks};
use crate::classify::Classifier;
use crate::config::ProjectConfig;
use crate::core::{AssetCategory, BuildMode};
use crate::define::{Bindings, resolve_bindings};
use crate::graph::{GraphEnv, ModuleCache, Resolver, Superseded, build_graph};
use crate::logger::ProgressLine;
use crate::output::{OutputArtifact, dedupe};
use crate::transform::{CancelToken, Checker, TransformContext, TypeDiagnostic};

pub struct Pipeline {
    config: ProjectConfig,
    mode: BuildMode,
    classifier: Classifier,
    resolver: Resolver,
    policy: ChunkPolicy,
    bindings: Arc<Bindings>,
    targets: Targets,
    cache: ModuleCache,
    /// Per-file tokens of chains currently running.
    inflight: DashMap<PathBuf, CancelToken>,
    /// Token of the build in progress.
    current: Mutex<CancelToken>,
    checker: Option<Checker>,
    /// `--clean` applies to the first build only.
    clean_pending: AtomicBool,
}

impl Pipeline {
    pub fn new(config: &ProjectConfig, mode: BuildMode) -> Result<Self, BuildError> {
        let checker = config
            .check
            .enable
            .then(|| Checker::spawn().excluding(&config.check.exclude));

        Ok(Self {
            classifier: Classifier::new(&config.root, config.build.inline_limit),
            resolver: Resolver::new(&config.root, &config.resolve),
            policy: ChunkPolicy::from_config(&config.chunks)?,
            bindings: resolve_bindings(mode, config),
            targets: crate::transform::targets(&config.build.targets),
            cache: ModuleCache::default(),
            inflight: DashMap::new(),
            current: Mutex::new(CancelToken::new()),
            checker,
            clean_pending: AtomicBool::new(config.build.clean),
            config: config.clone(),
            mode,
        })
    }

    pub fn mode(&self) -> BuildMode {
        self.mode
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// Run one build. Per-file failures are reported, not returned.
    pub fn build(&self, quiet: bool) -> Result<BuildReport, BuildError> {
        let token = CancelToken::new();
        *self.current.lock() = token.clone();

        let public_path = self.config.build.public_path(self.mode);
        let ctx = TransformContext {
            mode: self.mode,
            bindings: &self.bindings,
            targets: self.targets,
            script_target: &self.config.build.script_target,
            public_path: &public_path,
            checker: self.checker.as_ref(),
        };

        let names = AssetCategory::ALL.map(AssetCategory::name);
        let progress = (!quiet).then(|| ProgressLine::new(&names));
        let env = GraphEnv {
            root: &self.config.root,
            classifier: &self.classifier,
            resolver: &self.resolver,
            ctx: &ctx,
            cache: &self.cache,
            inflight: &self.inflight,
            cancel: &token,
            minify: self.config.build.minify(self.mode),
            progress: progress.as_ref(),
        };

        let outcome = match build_graph(&env, &self.config.build.entries) {
            Ok(outcome) => outcome,
            Err(Superseded) => return Ok(BuildReport::superseded()),
        };
        if let Some(progress) = progress {
            progress.finish();
        }

        let plan = plan_chunks(&outcome.graph, &self.policy);
        let chunk_files = emit_chunks(&outcome.graph, &plan, self.mode, &public_path);

        let mut artifacts: Vec<OutputArtifact> = outcome
            .graph
            .modules
            .values()
            .filter_map(|m| m.output.asset.clone())
            .collect();
        for files in &chunk_files {
            artifacts.push(files.script.clone());
            artifacts.extend(files.style.clone());
        }
        let (artifacts, collisions) = dedupe(artifacts);

        let mut report = BuildReport {
            outcome: BuildOutcome::Complete,
            errors: outcome.errors,
            collisions,
            warnings: outcome.warnings,
            conflicts: plan.conflicts.clone(),
            written: Vec::new(),
            reused: outcome.reused,
            modules: outcome.graph.modules.len(),
        };
        if !report.collisions.is_empty() {
            return Ok(report);
        }
        if token.is_cancelled() {
            return Ok(BuildReport::superseded());
        }

        let out = self.config.output_dir();
        write::prepare_output(out, self.clean_pending.swap(false, Ordering::SeqCst))?;
        let public = self.config.root_join(&self.config.build.public_dir);
        report.written.extend(write::copy_public(&public, out)?);
        write::write_artifacts(out, &artifacts)?;
        report.written.extend(artifacts.iter().map(|a| a.destination.clone()));

        if self.config.html.enable {
            let template = html::read_template(&self.config.root, &self.config.html)
                .map_err(|e| BuildError::Io(self.config.root_join(&self.config.html.template), e))?;
            let page = html::render_page(
                &self.config.html,
                template.as_deref(),
                &plan,
                &chunk_files,
                &public_path,
            );
            write::write_file(&out.join(&self.config.html.filename), page.as_bytes())?;
            report.written.push(self.config.html.filename.clone());
        }

        Ok(report)
    }

    /// Cancel chains running over any of `paths`. Returns how many were
    /// cancelled; the build they belong to will report itself superseded.
    pub fn cancel_paths(&self, paths: &[PathBuf]) -> usize {
        let mut cancelled = 0;
        for path in paths {
            if let Some(token) = self.inflight.get(path) {
                token.cancel();
                cancelled += 1;
            }
        }
        cancelled
    }

    /// Stop the build in progress before its next chain starts.
    pub fn cancel_build(&self) {
        self.current.lock().cancel();
    }

    /// Advisory findings so far, waiting up to `wait` for queued checks.
    pub fn diagnostics(&self, wait: Duration) -> Vec<TypeDiagnostic> {
        match &self.checker {
            Some(checker) => {
                checker.wait_idle(wait);
                checker.drain()
            }
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests;
