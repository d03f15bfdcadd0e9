//! Registry-ready module output.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::output::OutputArtifact;

/// How a dependency was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DepKind {
    /// ES `import` / `export ... from`. Unresolvable is an error.
    Import,
    /// CommonJS `require("...")`. Unresolvable is a warning.
    Require,
    /// CSS `@import`.
    CssImport,
    /// CSS `url(...)`.
    CssUrl,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DepRequest {
    pub specifier: String,
    pub kind: DepKind,
}

impl DepRequest {
    pub fn new(specifier: impl Into<String>, kind: DepKind) -> Self {
        Self {
            specifier: specifier.into(),
            kind,
        }
    }
}

/// A `url(...)` reference left as a placeholder in extracted CSS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CssUrl {
    pub placeholder: String,
    pub url: String,
}

/// Stylesheet text destined for the chunk's CSS file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractedCss {
    pub text: String,
    pub urls: Vec<CssUrl>,
}

/// Output of a chain's final stage.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ModuleOutput {
    /// Factory body, run as `function (module, exports, require)`.
    pub code: String,
    /// Specifiers `require` will be called with, in source order.
    pub requests: Vec<DepRequest>,
    /// Extracted stylesheet, for styles only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub css: Option<ExtractedCss>,
    /// Standalone file, for externally emitted resources.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset: Option<OutputArtifact>,
    /// Value a CSS `url()` pointing here is replaced with: a data URI or
    /// the asset destination.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<ResourceUrl>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceUrl {
    DataUri(String),
    /// Destination relative to the output directory.
    File(String),
}

/// `exports.default = <value>` with the ES module marker.
pub fn default_export(value_js: &str) -> String {
    format!(
        "Object.defineProperty(exports, \"__esModule\", {{ value: true }});\n\
         exports.default = {value_js};\n"
    )
}

/// Default export of a CSS module class map, plus one named export per class.
pub fn class_map_exports(classes: &BTreeMap<String, String>) -> String {
    let map = serde_json::to_string(classes).unwrap_or_else(|_| "{}".to_string());
    let mut code = default_export(&map);
    code.push_str("Object.assign(exports, exports.default);\n");
    code
}

impl ModuleOutput {
    pub fn with_code(code: String) -> Self {
        Self {
            code,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_export_marks_es_module() {
        let code = default_export("\"/static/image/a.png\"");
        assert!(code.contains("__esModule"));
        assert!(code.ends_with("exports.default = \"/static/image/a.png\";\n"));
    }

    #[test]
    fn test_class_map_exports() {
        let classes = BTreeMap::from([("button".to_string(), "button__button-x1".to_string())]);
        let code = class_map_exports(&classes);
        assert!(code.contains(r#"{"button":"button__button-x1"}"#));
        assert!(code.contains("Object.assign(exports, exports.default)"));
    }
}
