//! Style stages on lightningcss.

use std::collections::BTreeMap;

use lightningcss::css_modules::{self, Pattern};
use lightningcss::dependencies::{Dependency, DependencyOptions};
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};

use super::module::{CssUrl, DepKind, DepRequest};
use crate::config::TargetsConfig;

/// Downcompiled stylesheet plus what it references.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleSheetOutput {
    pub css: String,
    /// Local class -> scoped class list.
    pub classes: BTreeMap<String, String>,
    /// `url()` placeholders, present when dependencies were analyzed.
    pub urls: Vec<CssUrl>,
    pub requests: Vec<DepRequest>,
}

pub fn targets(config: &TargetsConfig) -> Targets {
    let version = |v: &Option<String>| v.as_deref().and_then(TargetsConfig::encode);
    Targets::from(Browsers {
        chrome: version(&config.chrome),
        firefox: version(&config.firefox),
        safari: version(&config.safari),
        ..Browsers::default()
    })
}

/// Rename local classes and ids with `pattern`, returning the rewritten
/// text and the class map.
pub fn scope_classes(
    source: &str,
    filename: &str,
    pattern: &str,
) -> Result<(String, BTreeMap<String, String>), String> {
    let pattern = Pattern::parse(pattern).map_err(|e| e.to_string())?;
    let options = ParserOptions {
        filename: filename.to_string(),
        css_modules: Some(css_modules::Config {
            pattern,
            ..css_modules::Config::default()
        }),
        ..ParserOptions::default()
    };
    let sheet = StyleSheet::parse(source, options).map_err(|e| e.to_string())?;
    let result = sheet.to_css(PrinterOptions::default()).map_err(|e| e.to_string())?;

    let mut classes = BTreeMap::new();
    for (local, export) in result.exports.unwrap_or_default() {
        let mut names = vec![export.name];
        for composed in export.composes {
            if let css_modules::CssModuleReference::Local { name } = composed {
                names.push(name);
            }
        }
        classes.insert(local, names.join(" "));
    }
    Ok((result.code, classes))
}

/// Lower syntax and add prefixes for `targets`.
///
/// With `analyze`, `@import` rules are removed and reported as requests,
/// and `url()` values become placeholders filled in at chunk time.
pub fn downcompile(
    source: &str,
    filename: &str,
    targets: Targets,
    analyze: bool,
) -> Result<StyleSheetOutput, String> {
    let options = ParserOptions {
        filename: filename.to_string(),
        ..ParserOptions::default()
    };
    let mut sheet = StyleSheet::parse(source, options).map_err(|e| e.to_string())?;
    sheet
        .minify(MinifyOptions {
            targets,
            ..MinifyOptions::default()
        })
        .map_err(|e| e.to_string())?;
    let result = sheet
        .to_css(PrinterOptions {
            targets,
            analyze_dependencies: analyze.then_some(DependencyOptions {
                remove_imports: true,
            }),
            ..PrinterOptions::default()
        })
        .map_err(|e| e.to_string())?;

    let mut output = StyleSheetOutput {
        css: result.code,
        ..StyleSheetOutput::default()
    };
    for dep in result.dependencies.unwrap_or_default() {
        match dep {
            Dependency::Import(import) => {
                output.requests.push(DepRequest::new(import.url, DepKind::CssImport));
            }
            Dependency::Url(url) => {
                if is_local_url(&url.url) {
                    output.requests.push(DepRequest::new(url.url.clone(), DepKind::CssUrl));
                }
                output.urls.push(CssUrl {
                    placeholder: url.placeholder,
                    url: url.url,
                });
            }
        }
    }
    Ok(output)
}

/// Compact a stylesheet. Placeholders survive as plain url strings.
pub fn minify(source: &str, targets: Targets) -> Result<String, String> {
    let sheet = StyleSheet::parse(source, ParserOptions::default()).map_err(|e| e.to_string())?;
    let result = sheet
        .to_css(PrinterOptions {
            minify: true,
            targets,
            ..PrinterOptions::default()
        })
        .map_err(|e| e.to_string())?;
    Ok(result.code)
}

/// Urls resolved through the module graph; the rest are left as written.
pub fn is_local_url(url: &str) -> bool {
    !(url.is_empty()
        || url.starts_with('#')
        || url.starts_with('/')
        || url.starts_with("data:")
        || url.contains("://"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_classes_builds_map() {
        let (css, classes) = scope_classes(
            ".button { color: red } .primary { composes: button; }",
            "src/button.module.css",
            "[name]__[local]-[hash]",
        )
        .unwrap();
        let button = classes.get("button").unwrap();
        assert!(button.contains("__button-"));
        assert!(css.contains(button.as_str()));
        let primary = classes.get("primary").unwrap();
        assert!(primary.contains(' '));
    }

    #[test]
    fn test_downcompile_collects_dependencies() {
        let out = downcompile(
            "@import './base.css';\n.hero { background: url(./hero.png); }\n.x { background: url(data:image/png;base64,AA==) }",
            "src/app.css",
            Targets::default(),
            true,
        )
        .unwrap();
        assert_eq!(
            out.requests,
            vec![
                DepRequest::new("./base.css", DepKind::CssImport),
                DepRequest::new("./hero.png", DepKind::CssUrl),
            ]
        );
        assert!(!out.css.contains("@import"));
        assert!(!out.css.contains("./hero.png"));
        assert!(out.urls.iter().any(|u| u.url == "./hero.png" && out.css.contains(&u.placeholder)));
    }

    #[test]
    fn test_downcompile_adds_prefixes_for_old_targets() {
        let config = TargetsConfig {
            chrome: None,
            firefox: None,
            safari: Some("10".into()),
        };
        let out =
            downcompile(".a { user-select: none }", "a.css", targets(&config), false).unwrap();
        assert!(out.css.contains("-webkit-user-select"));
    }

    #[test]
    fn test_minify() {
        let css = minify(".a {\n  color: #ff0000;\n}\n", Targets::default()).unwrap();
        assert_eq!(css, ".a{color:red}");
    }

    #[test]
    fn test_local_urls() {
        assert!(is_local_url("./a.png"));
        assert!(is_local_url("fonts/a.woff2"));
        assert!(!is_local_url("data:image/png;base64,AA=="));
        assert!(!is_local_url("https://cdn.example.com/a.png"));
        assert!(!is_local_url("/static/a.png"));
        assert!(!is_local_url("#grad"));
    }
}
