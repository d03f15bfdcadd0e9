//! Chain execution.
//!
//! A chain runs to completion on one worker. Between stages the cancel
//! token is checked so a superseded watch build stops early.

use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use lightningcss::targets::Targets;

use super::chain::Chain;
use super::check::{CheckJob, Checker};
use super::error::{FailedAt, TransformError};
use super::link;
use super::module::{ExtractedCss, ModuleOutput, ResourceUrl, class_map_exports, default_export};
use super::resource;
use super::script::{self, CompileOptions, ScriptLang};
use super::stage::{StageName, TransformStage};
use super::style::{self, StyleSheetOutput};
use super::svg::{self, DefaultUrl};
use crate::classify::ComponentExport;
use crate::core::{AssetCategory, BuildMode};
use crate::define::Bindings;
use crate::output::OutputArtifact;
use crate::utils::{mime, path};

/// Cooperative cancellation flag shared by every chain of one build.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Build-wide inputs every chain reads.
pub struct TransformContext<'a> {
    pub mode: BuildMode,
    pub bindings: &'a Bindings,
    pub targets: Targets,
    pub script_target: &'a str,
    /// Prefix for URLs embedded in scripts.
    pub public_path: &'a str,
    pub checker: Option<&'a Checker>,
}

/// One file (or data URI) entering its chain.
pub struct AssetSource<'a> {
    pub id: &'a str,
    pub path: &'a Path,
    pub query: &'a str,
    pub category: AssetCategory,
    /// MIME type of a data URI; files use their extension.
    pub mime: Option<&'a str>,
    pub bytes: Vec<u8>,
}

#[derive(Debug)]
pub enum RunError {
    Failed(TransformError),
    Cancelled,
}

impl From<TransformError> for RunError {
    fn from(err: TransformError) -> Self {
        Self::Failed(err)
    }
}

struct Script {
    code: String,
    lang: ScriptLang,
}

struct Resource {
    bytes: Vec<u8>,
    inline: bool,
}

enum Value {
    Text(String),
    Bytes(Vec<u8>),
    Script(Script),
    Style(StyleSheetOutput),
    Json(serde_json::Value),
    Resource(Resource),
    Module(ModuleOutput),
}

/// Run `chain` over `source`.
pub fn run_chain(
    chain: &Chain,
    source: AssetSource<'_>,
    ctx: &TransformContext<'_>,
    cancel: &CancelToken,
) -> Result<ModuleOutput, RunError> {
    let mut source = source;
    let bytes = std::mem::take(&mut source.bytes);
    let mut value = match chain.source {
        super::ArtifactKind::Text => match String::from_utf8(bytes) {
            Ok(text) => Value::Text(text),
            Err(_) => {
                return Err(RunError::Failed(TransformError {
                    path: source.id.to_string(),
                    stage: FailedAt::Read,
                    message: "file is not valid UTF-8".to_string(),
                }));
            }
        },
        _ => Value::Bytes(bytes),
    };

    let mut runner = Runner {
        source: &source,
        ctx,
        chain,
        classes: None,
    };
    for stage in &chain.stages {
        if cancel.is_cancelled() {
            return Err(RunError::Cancelled);
        }
        value = runner
            .stage(stage, value)
            .map_err(|message| TransformError::new(source.id, stage.name, message))?;
    }

    match value {
        Value::Module(module) => Ok(module),
        _ => Err(RunError::Failed(TransformError::new(
            source.id,
            StageName::Emit,
            "chain did not produce a module",
        ))),
    }
}

struct Runner<'r, 'a> {
    source: &'r AssetSource<'a>,
    ctx: &'r TransformContext<'r>,
    chain: &'r Chain,
    /// Class map from module-scope-rewrite, consumed by extract/inline.
    classes: Option<std::collections::BTreeMap<String, String>>,
}

impl Runner<'_, '_> {
    fn stage(&mut self, stage: &TransformStage, value: Value) -> Result<Value, String> {
        use StageName as S;
        let src = self.source;

        Ok(match (stage.name, value) {
            (S::Define, Value::Text(text)) => {
                let lang = ScriptLang::from_option(stage.option_str("lang"));
                let replaced = match self.ctx.bindings.substitute(&text, lang.source_type()) {
                    Cow::Owned(replaced) => Some(replaced),
                    Cow::Borrowed(_) => None,
                };
                Value::Text(replaced.unwrap_or(text))
            }
            (S::SyntaxParse, Value::Text(code)) => {
                let lang = ScriptLang::from_option(stage.option_str("lang"));
                script::check_syntax(&code, lang)?;
                Value::Script(Script { code, lang })
            }
            (S::TypeCheck, Value::Script(s)) => {
                if let Some(checker) = self.ctx.checker {
                    checker.submit(CheckJob {
                        path: src.id.to_string(),
                        source: s.code.clone(),
                        lang: s.lang,
                    });
                }
                Value::Script(s)
            }
            (S::CompileToTarget, Value::Script(s)) => {
                let options = CompileOptions {
                    target: stage.option_str("target").unwrap_or(self.ctx.script_target),
                    jsx_development: stage.option_bool("jsx-development"),
                };
                let code = script::compile(src.path, &s.code, s.lang, options)?;
                Value::Script(Script {
                    code,
                    lang: ScriptLang::Js,
                })
            }
            (S::InjectLiveReload, Value::Script(s)) => Value::Script(Script {
                code: script::inject_live_reload(&s.code, src.id),
                lang: s.lang,
            }),
            (S::Minify, Value::Script(s)) => Value::Script(Script {
                code: script::minify(&s.code, s.lang)?,
                lang: s.lang,
            }),
            (S::Emit, Value::Script(s)) => {
                let linked = link::link(&s.code, s.lang, &self.ctx.bindings.import_meta_env())?;
                Value::Module(ModuleOutput {
                    code: linked.code,
                    requests: linked.requests,
                    ..ModuleOutput::default()
                })
            }

            (S::ModuleScopeRewrite, Value::Text(text)) => {
                let pattern = stage
                    .option_str("pattern")
                    .unwrap_or(super::chain::CSS_MODULE_PATTERN);
                let (css, classes) = style::scope_classes(&text, src.id, pattern)?;
                self.classes = Some(classes);
                Value::Text(css)
            }
            (S::Downcompile, Value::Text(text)) => {
                let analyze = self.chain.has(S::Extract);
                Value::Style(style::downcompile(&text, src.id, self.ctx.targets, analyze)?)
            }
            (S::Minify, Value::Style(mut sheet)) => {
                sheet.css = style::minify(&sheet.css, self.ctx.targets)?;
                Value::Style(sheet)
            }
            (S::Extract, Value::Style(sheet)) => {
                let code = match &self.classes {
                    Some(classes) => class_map_exports(classes),
                    None => String::new(),
                };
                Value::Module(ModuleOutput {
                    code,
                    requests: sheet.requests,
                    css: Some(ExtractedCss {
                        text: sheet.css,
                        urls: sheet.urls,
                    }),
                    ..ModuleOutput::default()
                })
            }
            (S::Inline, Value::Style(sheet)) => {
                let text = serde_json::Value::String(sheet.css).to_string();
                Value::Module(ModuleOutput::with_code(default_export(&text)))
            }

            (S::OptimizeSvg, Value::Bytes(bytes)) => {
                let prefix = stage
                    .option_bool("prefix-ids")
                    .then(|| format!("{}-", path::base_name(src.path)));
                Value::Bytes(svg::optimize_svg(&bytes, prefix.as_deref())?)
            }
            (S::ConvertToComponent, Value::Bytes(bytes)) => {
                let tree = svg::parse_svg(&bytes)?;
                let export = match stage.option_str("export") {
                    Some("named") => ComponentExport::Named,
                    _ => ComponentExport::Default,
                };
                let inline = stage
                    .option_u64("threshold")
                    .is_some_and(|limit| bytes.len() as u64 <= limit);
                let default_url = if inline {
                    DefaultUrl::Inline(resource::data_uri(mime::types::SVG, &bytes))
                } else {
                    let file = src
                        .path
                        .file_name()
                        .map(|f| f.to_string_lossy())
                        .unwrap_or_default();
                    DefaultUrl::Request(format!("./{file}?url"))
                };
                Value::Script(Script {
                    code: svg::component_module(&tree, export, &default_url),
                    lang: ScriptLang::Js,
                })
            }
            (S::SelectStrategy, Value::Bytes(bytes)) => {
                let strategy = resource::strategy_from(
                    stage.option_str("strategy"),
                    stage.option_u64("threshold"),
                );
                let inline = resource::should_inline(strategy, bytes.len() as u64);
                Value::Resource(Resource { bytes, inline })
            }
            (S::Emit, Value::Resource(res)) => Value::Module(self.emit_resource(res)),

            (S::JsonParse, Value::Text(text)) => {
                Value::Json(serde_json::from_str(&text).map_err(|e| e.to_string())?)
            }
            (S::Emit, Value::Json(json)) => {
                Value::Module(ModuleOutput::with_code(format!("module.exports = {json};\n")))
            }

            (name, _) => return Err(format!("stage `{name}` received the wrong input")),
        })
    }

    fn emit_resource(&self, res: Resource) -> ModuleOutput {
        let src = self.source;
        if res.inline {
            let mime_type = src.mime.unwrap_or_else(|| mime::from_path(src.path));
            let uri = resource::data_uri(mime_type, &res.bytes);
            let literal = serde_json::Value::String(uri.clone()).to_string();
            return ModuleOutput {
                code: default_export(&literal),
                url: Some(ResourceUrl::DataUri(uri)),
                ..ModuleOutput::default()
            };
        }

        let ext = path::extension(src.path).unwrap_or_default();
        let artifact = OutputArtifact::emit(
            src.id,
            src.category,
            &path::base_name(src.path),
            &ext,
            res.bytes,
            self.ctx.mode,
        );
        let url = artifact.url(self.ctx.public_path);
        let literal = serde_json::Value::String(url).to_string();
        ModuleOutput {
            code: default_export(&literal),
            url: Some(ResourceUrl::File(artifact.destination.clone())),
            asset: Some(artifact),
            ..ModuleOutput::default()
        }
    }
}
