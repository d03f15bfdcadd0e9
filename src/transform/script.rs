//! Script stages on oxc: parse check, compile to target, minify.
//!
//! Every stage takes source text and returns source text. Each gets its
//! own arena since oxc ASTs cannot outlive their allocator.

use std::path::Path;

use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::{Parser, ParserReturn};
use oxc::semantic::SemanticBuilder;
use oxc::span::SourceType;
use oxc::transformer::{JsxRuntime, TransformOptions, Transformer};

/// Source dialect a script is parsed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptLang {
    /// ES module JavaScript.
    Js,
    /// Script or module, decided by content. Used for vendor code.
    Unambiguous,
    Jsx,
    Ts,
    Tsx,
}

impl ScriptLang {
    pub fn from_option(lang: Option<&str>) -> Self {
        match lang {
            Some("ts") => Self::Ts,
            Some("tsx") => Self::Tsx,
            Some("jsx") => Self::Jsx,
            Some("js") => Self::Js,
            _ => Self::Unambiguous,
        }
    }

    pub fn source_type(self) -> SourceType {
        match self {
            Self::Js => SourceType::mjs(),
            Self::Unambiguous => SourceType::unambiguous(),
            Self::Jsx => SourceType::jsx(),
            Self::Ts => SourceType::ts(),
            Self::Tsx => SourceType::tsx(),
        }
    }
}

fn first_error(ret: &ParserReturn<'_>) -> Option<String> {
    ret.errors.first().map(|e| e.to_string())
}

/// Parse only, reporting the first syntax error.
pub fn check_syntax(source: &str, lang: ScriptLang) -> Result<(), String> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, lang.source_type()).parse();
    match first_error(&ret) {
        Some(message) => Err(message),
        None if ret.panicked => Err("parser aborted".to_string()),
        None => Ok(()),
    }
}

/// Options for [`compile`].
#[derive(Debug, Clone, Copy)]
pub struct CompileOptions<'a> {
    pub target: &'a str,
    pub jsx_development: bool,
}

/// Strip types, lower JSX and syntax newer than `target`.
pub fn compile(
    path: &Path,
    source: &str,
    lang: ScriptLang,
    options: CompileOptions<'_>,
) -> Result<String, String> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, lang.source_type()).parse();
    if let Some(message) = first_error(&ret) {
        return Err(message);
    }
    let mut program = ret.program;

    let scoping = SemanticBuilder::new()
        .build(&program)
        .semantic
        .into_scoping();

    let mut transform = TransformOptions::from_target(options.target)?;
    transform.jsx.runtime = JsxRuntime::Automatic;
    transform.jsx.development = options.jsx_development;

    let ret = Transformer::new(&allocator, path, &transform)
        .build_with_scoping(scoping, &mut program);
    if let Some(err) = ret.errors.first() {
        return Err(err.to_string());
    }

    Ok(Codegen::new().build(&program).code)
}

/// Compress and mangle.
pub fn minify(source: &str, lang: ScriptLang) -> Result<String, String> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, lang.source_type()).parse();
    if let Some(message) = first_error(&ret) {
        return Err(message);
    }
    let mut program = ret.program;
    let options = MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions::smallest()),
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);
    Ok(Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program)
        .code)
}

/// Development instrumentation: registers the module with the live-reload
/// client when it evaluates.
pub fn inject_live_reload(source: &str, module_id: &str) -> String {
    let id = serde_json::Value::String(module_id.to_string());
    format!("(globalThis.__rivet_hot = globalThis.__rivet_hot || []).push({id});\n{source}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_syntax_reports_error() {
        assert!(check_syntax("const a = 1;", ScriptLang::Js).is_ok());
        assert!(check_syntax("const = ;", ScriptLang::Js).is_err());
        assert!(check_syntax("let x: number = 1;", ScriptLang::Ts).is_ok());
        assert!(check_syntax("let x: number = 1;", ScriptLang::Js).is_err());
    }

    #[test]
    fn test_compile_strips_types_and_jsx() {
        let source = "import { useState } from 'react';\n\
                      export const App = (): JSX.Element => { const [n] = useState<number>(0); return <div>{n}</div>; };";
        let code = compile(
            Path::new("src/App.tsx"),
            source,
            ScriptLang::Tsx,
            CompileOptions {
                target: "es2020",
                jsx_development: false,
            },
        )
        .unwrap();
        assert!(!code.contains("<div>"));
        assert!(!code.contains(": number"));
        assert!(code.contains("react/jsx-runtime"));
    }

    #[test]
    fn test_compile_rejects_bad_target() {
        let result = compile(
            Path::new("a.ts"),
            "export {}",
            ScriptLang::Ts,
            CompileOptions {
                target: "not-a-target",
                jsx_development: false,
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_minify_shrinks() {
        let source = "export function add(first, second) {\n  return first + second;\n}\n";
        let code = minify(source, ScriptLang::Js).unwrap();
        assert!(code.len() < source.len());
        assert!(code.contains("export"));
    }

    #[test]
    fn test_inject_live_reload() {
        let code = inject_live_reload("export const a = 1;", "src/a.ts");
        assert!(code.starts_with(
            "(globalThis.__rivet_hot = globalThis.__rivet_hot || []).push(\"src/a.ts\");"
        ));
    }
}
