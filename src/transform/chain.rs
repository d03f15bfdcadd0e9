//! Chain builder: category + variant + mode -> ordered stages.
//!
//! ```text
//! script     define, syntax-parse, type-check, compile-to-target,
//!            [dev: inject-live-reload], [minify], emit
//! vendor     define, syntax-parse, [minify], emit
//! style      [module-scope-rewrite], downcompile, [minify], extract | inline
//! svg        optimize-svg, select-strategy, emit
//! component  optimize-svg, convert-to-component, emit
//! json       json-parse, emit
//! resource   select-strategy, emit
//! ```

use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use super::stage::{ArtifactKind, StageName, TransformStage};
use crate::classify::{ComponentExport, OutputStrategy, VariantRule};
use crate::core::{AssetCategory, BuildMode};
use crate::utils::path::slash;

/// Pattern for scoped class names in CSS modules.
pub const CSS_MODULE_PATTERN: &str = "[name]__[local]-[hash]";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("stage `{stage}` expects {expected:?} input but receives {found:?}")]
    KindMismatch {
        stage: StageName,
        expected: ArtifactKind,
        found: ArtifactKind,
    },

    #[error("chain ends in {0:?}, not a module")]
    Unterminated(ArtifactKind),

    #[error("empty chain")]
    Empty,
}

/// Per-asset facts the chain shape depends on.
#[derive(Debug, Clone, Copy)]
pub struct ChainContext<'a> {
    pub path: &'a Path,
    pub query: &'a str,
    pub minify: bool,
    pub script_target: &'a str,
}

/// A validated stage list plus the kind its first stage consumes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chain {
    pub source: ArtifactKind,
    pub stages: Vec<TransformStage>,
}

impl Chain {
    pub fn stage_names(&self) -> Vec<StageName> {
        self.stages.iter().map(|s| s.name).collect()
    }

    pub fn has(&self, name: StageName) -> bool {
        self.stages.iter().any(|s| s.name == name)
    }
}

/// Whether a stylesheet gets scoped class names.
///
/// Never for `node_modules`; otherwise on `?modules` or a `.module.` file.
pub fn is_scoped_style(path: &Path, query: &str) -> bool {
    let path = slash(path);
    if path.contains("node_modules/") {
        return false;
    }
    if query.contains("modules") {
        return true;
    }
    path.contains(".module.")
}

/// Kind the first stage consumes for a category/variant.
pub const fn source_kind(category: AssetCategory, variant: &VariantRule) -> ArtifactKind {
    match category {
        AssetCategory::Script | AssetCategory::Style | AssetCategory::Json => ArtifactKind::Text,
        AssetCategory::DataUri if variant.compile => ArtifactKind::Text,
        _ => ArtifactKind::Bytes,
    }
}

pub fn build_chain(
    category: AssetCategory,
    variant: &VariantRule,
    mode: BuildMode,
    ctx: &ChainContext<'_>,
) -> Result<Chain, ChainError> {
    use ArtifactKind as K;
    use StageName as S;

    let mut stages = Vec::new();
    match category {
        AssetCategory::Script | AssetCategory::DataUri if variant.compile => {
            let lang = script_lang(ctx.path);
            stages.push(TransformStage::new(S::Define, K::Text, K::Text).with("lang", lang));
            stages.push(
                TransformStage::new(S::SyntaxParse, K::Text, K::Script).with("lang", lang),
            );
            stages.push(
                TransformStage::new(S::TypeCheck, K::Script, K::Script).with("advisory", true),
            );
            stages.push(
                TransformStage::new(S::CompileToTarget, K::Script, K::Script)
                    .with("target", ctx.script_target)
                    .with("lang", lang)
                    .with("jsx-development", mode.is_dev()),
            );
            if mode.is_dev() {
                stages.push(TransformStage::new(S::InjectLiveReload, K::Script, K::Script));
            }
            if ctx.minify {
                stages.push(TransformStage::new(S::Minify, K::Script, K::Script));
            }
            stages.push(registry_emit());
        }
        AssetCategory::Script => {
            stages.push(TransformStage::new(S::Define, K::Text, K::Text).with("lang", "auto"));
            stages.push(
                TransformStage::new(S::SyntaxParse, K::Text, K::Script).with("lang", "auto"),
            );
            if ctx.minify {
                stages.push(TransformStage::new(S::Minify, K::Script, K::Script));
            }
            stages.push(registry_emit());
        }
        AssetCategory::Style => {
            if is_scoped_style(ctx.path, ctx.query) {
                stages.push(
                    TransformStage::new(S::ModuleScopeRewrite, K::Text, K::Text)
                        .with("pattern", CSS_MODULE_PATTERN),
                );
            }
            stages.push(TransformStage::new(S::Downcompile, K::Text, K::Style));
            if ctx.minify {
                stages.push(TransformStage::new(S::Minify, K::Style, K::Style));
            }
            let last = match variant.strategy {
                OutputStrategy::Inline => S::Inline,
                _ => S::Extract,
            };
            stages.push(TransformStage::new(last, K::Style, K::Module));
        }
        AssetCategory::Json => {
            stages.push(TransformStage::new(S::JsonParse, K::Text, K::Json));
            stages.push(TransformStage::new(S::Emit, K::Json, K::Module));
        }
        AssetCategory::Svg if variant.component.is_some() => {
            let export = match variant.component {
                Some(ComponentExport::Named) => "named",
                _ => "default",
            };
            let mut convert = TransformStage::new(S::ConvertToComponent, K::Bytes, K::Script)
                .with("export", export);
            if let OutputStrategy::DataUriIfSmall(limit) = variant.strategy {
                convert = convert.with("threshold", limit);
            }
            stages.push(
                TransformStage::new(S::OptimizeSvg, K::Bytes, K::Bytes).with("prefix-ids", true),
            );
            stages.push(convert);
            stages.push(registry_emit());
        }
        _ => {
            if category == AssetCategory::Svg {
                stages.push(TransformStage::new(S::OptimizeSvg, K::Bytes, K::Bytes));
            }
            stages.push(strategy_stage(variant.strategy));
            stages.push(TransformStage::new(S::Emit, K::Resource, K::Module));
        }
    }

    let chain = Chain {
        source: source_kind(category, variant),
        stages,
    };
    validate(&chain)?;
    Ok(chain)
}

/// Final stage of every script chain.
fn registry_emit() -> TransformStage {
    TransformStage::new(StageName::Emit, ArtifactKind::Script, ArtifactKind::Module)
        .with("format", "registry")
}

fn strategy_stage(strategy: OutputStrategy) -> TransformStage {
    let stage = TransformStage::new(
        StageName::SelectStrategy,
        ArtifactKind::Bytes,
        ArtifactKind::Resource,
    );
    match strategy {
        OutputStrategy::Inline => stage.with("strategy", "inline"),
        OutputStrategy::ExternalFile => stage.with("strategy", "external-file"),
        OutputStrategy::DataUriIfSmall(limit) => stage
            .with("strategy", "data-uri-if-small")
            .with("threshold", limit),
    }
}

/// Check kind continuity from the source kind to a final module.
pub fn validate(chain: &Chain) -> Result<(), ChainError> {
    let mut current = chain.source;
    for stage in &chain.stages {
        if stage.input != current {
            return Err(ChainError::KindMismatch {
                stage: stage.name,
                expected: stage.input,
                found: current,
            });
        }
        current = stage.output;
    }
    match chain.stages.last() {
        None => Err(ChainError::Empty),
        Some(_) if current != ArtifactKind::Module => Err(ChainError::Unterminated(current)),
        Some(_) => Ok(()),
    }
}

/// Source dialect from the extension.
fn script_lang(path: &Path) -> &'static str {
    match crate::utils::path::extension(path).as_deref() {
        Some("ts" | "mts" | "cts") => "ts",
        Some("tsx") => "tsx",
        Some("jsx") => "jsx",
        _ => "js",
    }
}
