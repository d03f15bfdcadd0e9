//! Chunk files: registry scripts plus the extracted stylesheet.
//!
//! ```text
//! (globalThis.__rivet_modules = globalThis.__rivet_modules || {});
//! Object.assign(globalThis.__rivet_modules, {
//! "src/App.tsx": [function (module, exports, require) {
//! ...
//! }, {"./App.css":"src/App.css"}],
//! });
//! globalThis.__rivet_start("src/index.tsx");   // entry chunks only
//! ```

use std::fmt::Write as _;

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

use super::plan::{Chunk, ChunkPlan};
use crate::core::{AssetCategory, BuildMode};
use crate::embed::RUNTIME_JS;
use crate::graph::{ModuleGraph, ModuleRecord};
use crate::output::OutputArtifact;
use crate::transform::ResourceUrl;

/// Characters that would end an unquoted `url(...)` early.
const CSS_URL_ESCAPE: &AsciiSet = &CONTROLS.add(b' ').add(b'(').add(b')').add(b'\'').add(b'"');

/// Files produced for one chunk.
#[derive(Debug, Clone)]
pub struct ChunkFiles {
    pub name: String,
    pub script: OutputArtifact,
    pub style: Option<OutputArtifact>,
}

pub fn emit_chunks(
    graph: &ModuleGraph,
    plan: &ChunkPlan,
    mode: BuildMode,
    public_path: &str,
) -> Vec<ChunkFiles> {
    plan.chunks
        .values()
        .map(|chunk| emit_chunk(graph, chunk, mode, public_path))
        .collect()
}

fn emit_chunk(
    graph: &ModuleGraph,
    chunk: &Chunk,
    mode: BuildMode,
    public_path: &str,
) -> ChunkFiles {
    let modules: Vec<&ModuleRecord> = chunk.modules.iter().filter_map(|id| graph.get(id)).collect();

    let script = chunk_script(&modules, chunk.entry.as_deref());
    let script = OutputArtifact::emit(
        chunk.name.clone(),
        AssetCategory::Script,
        &chunk.name,
        "js",
        script.into_bytes(),
        mode,
    );

    let style = chunk_style(graph, &modules, public_path).map(|css| {
        OutputArtifact::emit(
            chunk.name.clone(),
            AssetCategory::Style,
            &chunk.name,
            "css",
            css.into_bytes(),
            mode,
        )
    });

    ChunkFiles {
        name: chunk.name.clone(),
        script,
        style,
    }
}

fn chunk_script(modules: &[&ModuleRecord], entry: Option<&str>) -> String {
    let mut out = String::new();
    if entry.is_some() {
        out.push_str(RUNTIME_JS);
        out.push('\n');
    }

    out.push_str("(globalThis.__rivet_modules = globalThis.__rivet_modules || {});\n");
    out.push_str("Object.assign(globalThis.__rivet_modules, {\n");
    for record in modules {
        let deps = serde_json::to_string(&record.deps).unwrap_or_else(|_| "{}".to_string());
        let _ = writeln!(
            out,
            "{}: [function (module, exports, require) {{\n{}\n}}, {deps}],",
            js_string(&record.id),
            record.output.code.trim_end(),
        );
    }
    out.push_str("});\n");

    if let Some(entry) = entry {
        let _ = writeln!(out, "globalThis.__rivet_start({});", js_string(entry));
    }
    out
}

/// Extracted CSS of the chunk's modules in dependency order, with `url()`
/// placeholders filled in. `None` when no module carries CSS.
fn chunk_style(
    graph: &ModuleGraph,
    modules: &[&ModuleRecord],
    public_path: &str,
) -> Option<String> {
    let mut out = String::new();
    for record in modules {
        let Some(css) = &record.output.css else { continue };
        let mut text = css.text.clone();
        for url in &css.urls {
            let value = record
                .deps
                .get(&url.url)
                .and_then(|id| graph.get(id))
                .and_then(|target| target.output.url.as_ref())
                .map_or_else(|| url.url.clone(), |target| css_url(target, public_path));
            text = text.replace(&url.placeholder, &value);
        }
        out.push_str(text.trim_end());
        out.push('\n');
    }
    (!out.is_empty()).then_some(out)
}

/// URL as written into a stylesheet under `static/css/`.
fn css_url(target: &ResourceUrl, public_path: &str) -> String {
    match target {
        ResourceUrl::DataUri(uri) => utf8_percent_encode(uri, CSS_URL_ESCAPE).to_string(),
        ResourceUrl::File(dest) if is_absolute(public_path) => format!("{public_path}{dest}"),
        ResourceUrl::File(dest) => {
            let inside_static = dest.strip_prefix("static/").unwrap_or(dest);
            format!("../{inside_static}")
        }
    }
}

fn is_absolute(public_path: &str) -> bool {
    public_path.starts_with('/') || public_path.contains("://")
}

fn js_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use super::*;
    use crate::chunk::{ChunkPolicy, plan_chunks};
    use crate::config::section::default_chunk_groups;
    use crate::transform::{CssUrl, DepKind, DepRequest, ExtractedCss, ModuleOutput};

    fn record(
        id: &str,
        category: AssetCategory,
        output: ModuleOutput,
        deps: &[(&str, &str)],
    ) -> ModuleRecord {
        ModuleRecord {
            id: id.to_string(),
            path: Some(format!("/p/{id}").into()),
            category,
            output: Arc::new(output),
            deps: deps.iter().map(|(s, d)| (s.to_string(), d.to_string())).collect(),
            failed: false,
        }
    }

    fn sample_graph() -> ModuleGraph {
        let index = ModuleOutput {
            code: "require(\"./app.css\");\nrequire(\"react\");\n".into(),
            requests: vec![
                DepRequest::new("./app.css", DepKind::Import),
                DepRequest::new("react", DepKind::Import),
            ],
            ..ModuleOutput::default()
        };
        let css = ModuleOutput {
            requests: vec![
                DepRequest::new("./bg.png", DepKind::CssUrl),
                DepRequest::new("./dot.png", DepKind::CssUrl),
            ],
            css: Some(ExtractedCss {
                text: ".a{background:url(P1)}.b{background:url(P2)}.c{background:url(P3)}".into(),
                urls: vec![
                    CssUrl { placeholder: "P1".into(), url: "./bg.png".into() },
                    CssUrl { placeholder: "P2".into(), url: "./dot.png".into() },
                    CssUrl { placeholder: "P3".into(), url: "https://cdn/x.png".into() },
                ],
            }),
            ..ModuleOutput::default()
        };
        let bg = ModuleOutput {
            url: Some(ResourceUrl::File("static/image/bg.png".into())),
            ..ModuleOutput::default()
        };
        let dot = ModuleOutput {
            url: Some(ResourceUrl::DataUri("data:image/png;base64,AA==".into())),
            ..ModuleOutput::default()
        };
        let react = ModuleOutput::with_code("module.exports = {};\n".into());

        ModuleGraph {
            modules: [
                record(
                    "src/index.tsx",
                    AssetCategory::Script,
                    index,
                    &[("./app.css", "src/app.css"), ("react", "node_modules/react/index.js")],
                ),
                record(
                    "src/app.css",
                    AssetCategory::Style,
                    css,
                    &[("./bg.png", "src/bg.png"), ("./dot.png", "src/dot.png")],
                ),
                record("src/bg.png", AssetCategory::Image, bg, &[]),
                record("src/dot.png", AssetCategory::Image, dot, &[]),
                record("node_modules/react/index.js", AssetCategory::Script, react, &[]),
            ]
            .into_iter()
            .map(|r| (r.id.clone(), r))
            .collect(),
            entries: BTreeMap::from([("index".to_string(), "src/index.tsx".to_string())]),
        }
    }

    fn emit(mode: BuildMode, public_path: &str) -> Vec<ChunkFiles> {
        let graph = sample_graph();
        let policy = ChunkPolicy::from_config(&default_chunk_groups()).unwrap();
        let plan = plan_chunks(&graph, &policy);
        emit_chunks(&graph, &plan, mode, public_path)
    }

    fn text(artifact: &OutputArtifact) -> &str {
        std::str::from_utf8(&artifact.bytes).unwrap()
    }

    #[test]
    fn test_entry_chunk_carries_runtime_and_start() {
        let files = emit(BuildMode::Development, "/");
        let index = files.iter().find(|f| f.name == "index").unwrap();
        let js = text(&index.script);
        assert!(js.starts_with(RUNTIME_JS));
        assert!(js.contains(r#""src/index.tsx": [function (module, exports, require) {"#));
        assert!(js.contains(r#"{"./app.css":"src/app.css","react":"node_modules/react/index.js"}"#));
        assert!(js.trim_end().ends_with(r#"globalThis.__rivet_start("src/index.tsx");"#));
        assert_eq!(index.script.destination, "static/js/index.js");
    }

    #[test]
    fn test_group_chunk_has_no_runtime() {
        let files = emit(BuildMode::Development, "/");
        let react = files.iter().find(|f| f.name == "lib-react").unwrap();
        let js = text(&react.script);
        assert!(js.starts_with("(globalThis.__rivet_modules"));
        assert!(!js.contains("__rivet_start("));
        assert!(react.style.is_none());
    }

    #[test]
    fn test_css_urls_with_absolute_public_path() {
        let files = emit(BuildMode::Development, "/");
        let index = files.iter().find(|f| f.name == "index").unwrap();
        let style = index.style.as_ref().unwrap();
        let css = text(style);
        assert!(css.contains("url(/static/image/bg.png)"));
        assert!(css.contains("url(data:image/png;base64,AA==)"));
        assert!(css.contains("url(https://cdn/x.png)"));
        assert_eq!(style.destination, "static/css/index.css");
    }

    #[test]
    fn test_css_urls_with_relative_public_path() {
        let files = emit(BuildMode::Production, "./");
        let index = files.iter().find(|f| f.name == "index").unwrap();
        let css = text(index.style.as_ref().unwrap());
        assert!(css.contains("url(../image/bg.png)"));
        assert!(index.script.destination.starts_with("static/js/index."));
    }

    #[test]
    fn test_data_uri_escaped_for_unquoted_url() {
        let uri = ResourceUrl::DataUri("data:image/svg+xml,<svg a='1'>(x)</svg>".into());
        let url = css_url(&uri, "/");
        assert!(!url.contains(['\'', '(', ')', ' ']));
    }
}
