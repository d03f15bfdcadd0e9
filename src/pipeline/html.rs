//! `index.html` emission.
//!
//! The project template (or the built-in page) gets, inside `<head>`:
//!
//! ```text
//! <title>..</title>                       unless the template has one
//! <meta name=".." content="..">           per [html.meta], unless present
//! <link rel="stylesheet" href="..">       per chunk stylesheet
//! <script defer src=".."></script>        per chunk, entry chunks last
//! ```

use std::path::Path;

use crate::chunk::{ChunkFiles, ChunkPlan};
use crate::config::HtmlConfig;
use crate::embed::html::DEFAULT_HTML;
use crate::utils::html::{escape, escape_attr, inject_before};

/// Render the page for the entries listed in `[html] chunks`.
///
/// Chunks are listed in the order the entries need them. An entry chunk
/// pulled in only because another entry shares its modules is marked
/// `data-rivet-shared` so it registers modules without starting.
pub fn render_page(
    config: &HtmlConfig,
    template: Option<&str>,
    plan: &ChunkPlan,
    files: &[ChunkFiles],
    public_path: &str,
) -> String {
    let mut html = template.unwrap_or(DEFAULT_HTML).to_string();
    let lower = html.to_ascii_lowercase();

    let mut head = String::new();
    if !lower.contains("<title") {
        head.push_str(&format!("<title>{}</title>\n", escape(&config.title)));
    }
    for (name, content) in &config.meta {
        if lower.contains(&format!("name=\"{}\"", name.to_ascii_lowercase())) {
            continue;
        }
        head.push_str(&format!(
            "<meta name=\"{}\" content=\"{}\">\n",
            escape_attr(name),
            escape_attr(content)
        ));
    }

    let mut order: Vec<&str> = Vec::new();
    for entry in &config.chunks {
        for name in plan.entry_chunks.get(entry).into_iter().flatten() {
            if !order.contains(&name.as_str()) {
                order.push(name);
            }
        }
    }

    let chunk_files = |name: &str| files.iter().find(|f| f.name == name);
    for &name in &order {
        if let Some(style) = chunk_files(name).and_then(|f| f.style.as_ref()) {
            head.push_str(&format!(
                "<link rel=\"stylesheet\" href=\"{}\">\n",
                escape_attr(&style.url(public_path))
            ));
        }
    }
    for &name in &order {
        let Some(file) = chunk_files(name) else { continue };
        let shared = plan.chunks.get(name).is_some_and(|c| c.entry.is_some())
            && !config.chunks.iter().any(|entry| entry == name);
        head.push_str(&format!(
            "<script defer src=\"{}\"{}></script>\n",
            escape_attr(&file.script.url(public_path)),
            if shared { " data-rivet-shared" } else { "" }
        ));
    }

    html = inject_before(&html, "head", &head);
    html
}

/// Read the configured template; `None` when it does not exist.
pub fn read_template(root: &Path, config: &HtmlConfig) -> std::io::Result<Option<String>> {
    let path = root.join(&config.template);
    match std::fs::read_to_string(&path) {
        Ok(text) => Ok(Some(text)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::chunk::Chunk;
    use crate::core::{AssetCategory, BuildMode};
    use crate::output::OutputArtifact;

    fn files(name: &str, css: bool) -> ChunkFiles {
        let artifact = |category, ext| {
            OutputArtifact::emit(name, category, name, ext, b"x".to_vec(), BuildMode::Development)
        };
        ChunkFiles {
            name: name.to_string(),
            script: artifact(AssetCategory::Script, "js"),
            style: css.then(|| artifact(AssetCategory::Style, "css")),
        }
    }

    fn plan() -> ChunkPlan {
        let chunk = |name: &str, entry: Option<&str>| Chunk {
            name: name.into(),
            modules: Vec::new(),
            entry: entry.map(Into::into),
        };
        ChunkPlan {
            chunks: BTreeMap::from([
                ("admin".into(), chunk("admin", Some("src/admin.tsx"))),
                ("index".into(), chunk("index", Some("src/index.tsx"))),
                ("lib-react".into(), chunk("lib-react", None)),
            ]),
            entry_chunks: BTreeMap::from([
                ("index".into(), vec!["admin".into(), "lib-react".into(), "index".into()]),
                ("admin".into(), vec!["lib-react".into(), "admin".into()]),
            ]),
            ..ChunkPlan::default()
        }
    }

    #[test]
    fn test_default_page() {
        let config = HtmlConfig::default();
        let all = vec![files("index", true), files("lib-react", false), files("admin", false)];
        let html = render_page(&config, None, &plan(), &all, "/");

        assert!(html.contains("<title>rivet app</title>"));
        assert!(html.contains("<meta name=\"viewport\""));
        assert!(html.contains("<link rel=\"stylesheet\" href=\"/static/css/index.css\">"));
        assert!(
            html.contains("<script defer src=\"/static/js/admin.js\" data-rivet-shared></script>")
        );

        let react = html.find("/static/js/lib-react.js").unwrap();
        let index = html.find("/static/js/index.js").unwrap();
        let head_end = html.find("</head>").unwrap();
        assert!(react < index && index < head_end);
    }

    #[test]
    fn test_template_keeps_its_title_and_meta() {
        let config = HtmlConfig::default();
        let template = "<html><head><title>Mine</title><meta name=\"viewport\" content=\"x\">\
                        </head><body></body></html>";
        let html = render_page(&config, Some(template), &plan(), &[files("index", false)], "./");
        assert_eq!(html.matches("<title>").count(), 1);
        assert_eq!(html.matches("name=\"viewport\"").count(), 1);
        assert!(html.contains("src=\"./static/js/index.js\""));
    }

    #[test]
    fn test_listed_entries_start() {
        let config = HtmlConfig {
            chunks: vec!["index".into(), "admin".into()],
            ..HtmlConfig::default()
        };
        let all = vec![files("index", false), files("admin", false)];
        let html = render_page(&config, None, &plan(), &all, "/");
        assert!(!html.contains("data-rivet-shared"));
    }

    #[test]
    fn test_read_missing_template() {
        let dir = tempfile::TempDir::new().unwrap();
        assert_eq!(read_template(dir.path(), &HtmlConfig::default()).unwrap(), None);
        std::fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
        assert!(read_template(dir.path(), &HtmlConfig::default()).unwrap().is_some());
    }
}
