//! Embedded runtime resources.
//!
//! - `RUNTIME_JS` - module registry, prepended to every entry chunk
//! - `serve` - live-reload client with its error overlay
//! - `html` - page used when the project has no template
//!
//! Scripts are minified at compile time by `build.rs`.

mod template;

pub use template::{Template, TemplateVars};

/// Module registry runtime.
pub const RUNTIME_JS: &str = include_str!(concat!(env!("OUT_DIR"), "/runtime.min.js"));

pub mod serve {
    use super::{Template, TemplateVars};

    /// URL the dev server answers with the live-reload client.
    pub const LIVERELOAD_PATH: &str = "/__rivet/livereload.js";

    pub struct LiveReloadVars {
        pub ws_port: u16,
    }

    impl TemplateVars for LiveReloadVars {
        fn apply(&self, content: &str) -> String {
            content.replace("__RIVET_WS_PORT__", &self.ws_port.to_string())
        }
    }

    /// Live-reload client with WebSocket port injection.
    pub const LIVERELOAD_JS: Template<LiveReloadVars> =
        Template::new(include_str!(concat!(env!("OUT_DIR"), "/livereload.min.js")));

    /// `<script>` tag that loads the client.
    pub fn livereload_tag() -> String {
        format!("<script src=\"{LIVERELOAD_PATH}\" defer></script>")
    }
}

pub mod html {
    /// Built-in page: charset, empty head, `#root` mount point.
    pub const DEFAULT_HTML: &str = include_str!("index.html");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_exposes_registry() {
        assert!(RUNTIME_JS.contains("__rivet_modules"));
        assert!(RUNTIME_JS.contains("__rivet_start"));
        assert!(RUNTIME_JS.contains("data-rivet-shared"));
        assert!(RUNTIME_JS.contains("baseURI"));
    }

    #[test]
    fn test_livereload_with_vars() {
        let vars = serve::LiveReloadVars { ws_port: 35729 };
        let rendered = serve::LIVERELOAD_JS.render(&vars);
        assert!(rendered.contains("35729"));
        assert!(!rendered.contains("__RIVET_WS_PORT__"));
        assert!(!rendered.contains("__RIVET_OVERLAY_CSS__"));
        assert!(rendered.contains("rivet-overlay"));
    }

    #[test]
    fn test_livereload_tag() {
        assert!(serve::livereload_tag().contains(serve::LIVERELOAD_PATH));
    }

    #[test]
    fn test_default_html_has_head() {
        assert!(html::DEFAULT_HTML.contains("</head>"));
        assert!(serve::LIVERELOAD_JS.content().contains("WebSocket"));
    }
}
