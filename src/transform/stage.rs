//! Transform stage descriptors.

use std::collections::BTreeMap;

use serde::Serialize;

/// Shape of the value flowing between stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    /// Raw source text as read from disk.
    Text,
    /// Raw bytes as read from disk.
    Bytes,
    /// Script source that parsed successfully.
    Script,
    /// Stylesheet text plus its class map and dependencies.
    Style,
    /// Parsed JSON data.
    Json,
    /// Bytes with an output strategy decided.
    Resource,
    /// Registry-ready module: factory body, requests, optional CSS and file.
    Module,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageName {
    Define,
    SyntaxParse,
    TypeCheck,
    CompileToTarget,
    InjectLiveReload,
    Minify,
    ModuleScopeRewrite,
    Downcompile,
    Extract,
    Inline,
    OptimizeSvg,
    ConvertToComponent,
    SelectStrategy,
    JsonParse,
    Emit,
}

impl StageName {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Define => "define",
            Self::SyntaxParse => "syntax-parse",
            Self::TypeCheck => "type-check",
            Self::CompileToTarget => "compile-to-target",
            Self::InjectLiveReload => "inject-live-reload",
            Self::Minify => "minify",
            Self::ModuleScopeRewrite => "module-scope-rewrite",
            Self::Downcompile => "downcompile",
            Self::Extract => "extract",
            Self::Inline => "inline",
            Self::OptimizeSvg => "optimize-svg",
            Self::ConvertToComponent => "convert-to-component",
            Self::SelectStrategy => "select-strategy",
            Self::JsonParse => "json-parse",
            Self::Emit => "emit",
        }
    }
}

impl std::fmt::Display for StageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of a chain. Options carry the per-asset knobs the stage needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransformStage {
    pub name: StageName,
    pub input: ArtifactKind,
    pub output: ArtifactKind,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, serde_json::Value>,
}

impl TransformStage {
    pub fn new(name: StageName, input: ArtifactKind, output: ArtifactKind) -> Self {
        Self {
            name,
            input,
            output,
            options: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.options.insert(key.to_string(), value.into());
        self
    }

    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(serde_json::Value::as_str)
    }

    pub fn option_bool(&self, key: &str) -> bool {
        self.options
            .get(key)
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }

    pub fn option_u64(&self, key: &str) -> Option<u64> {
        self.options.get(key).and_then(serde_json::Value::as_u64)
    }
}
