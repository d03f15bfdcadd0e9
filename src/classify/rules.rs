//! Rule table: ordered predicate -> action pairs.

use std::path::Path;

use serde::Serialize;

use super::condition::Condition;
use crate::core::AssetCategory;

/// How a resource reaches the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "threshold", rename_all = "kebab-case")]
pub enum OutputStrategy {
    /// Embedded in the importing module (data URI, or text for styles).
    Inline,
    /// Written to its own file and referenced by URL.
    ExternalFile,
    /// Data URI when the final bytes are at most this many, otherwise a file.
    DataUriIfSmall(u64),
}

/// Export shape of an SVG compiled to a component module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentExport {
    /// `export default Component`
    Default,
    /// `export const ReactComponent`, with the URL as default export.
    Named,
}

#[derive(Debug, Clone)]
pub struct VariantRule {
    pub name: String,
    pub condition: Condition,
    pub strategy: OutputStrategy,
    pub component: Option<ComponentExport>,
    /// Scripts only: run type-check and compile-to-target.
    pub compile: bool,
}

impl VariantRule {
    pub fn new(name: &str, condition: Condition, strategy: OutputStrategy) -> Self {
        Self {
            name: name.to_string(),
            condition,
            strategy,
            component: None,
            compile: false,
        }
    }

    pub fn component(mut self, export: ComponentExport) -> Self {
        self.component = Some(export);
        self
    }

    pub fn compiled(mut self) -> Self {
        self.compile = true;
        self
    }
}

#[derive(Debug, Clone)]
pub struct AssetRule {
    pub name: String,
    pub matcher: Condition,
    pub category: AssetCategory,
    /// Evaluated in order; the first whose condition holds wins.
    pub variants: Vec<VariantRule>,
}

impl AssetRule {
    pub fn new(name: &str, matcher: Condition, category: AssetCategory) -> Self {
        Self {
            name: name.to_string(),
            matcher,
            category,
            variants: Vec::new(),
        }
    }

    pub fn variant(mut self, variant: VariantRule) -> Self {
        self.variants.push(variant);
        self
    }
}

const SCRIPT_ISSUER: &str = r"\.(?:js|jsx|mjs|cjs|ts|tsx|mts|cts|mdx)$";
const NODE_MODULES: &str = r"[\\/]node_modules[\\/]";
const URL_QUERY: &str = "(__inline=false|url)";

/// `url` / `inline` / `asset` variants shared by binary resources.
fn resource_variants(rule: AssetRule, limit: u64) -> AssetRule {
    rule.variant(VariantRule::new(
        "url",
        Condition::query(URL_QUERY),
        OutputStrategy::ExternalFile,
    ))
    .variant(VariantRule::new(
        "inline",
        Condition::query("inline"),
        OutputStrategy::Inline,
    ))
    .variant(VariantRule::new(
        "asset",
        Condition::Always,
        OutputStrategy::DataUriIfSmall(limit),
    ))
}

/// Project sources outside `node_modules`.
fn in_project(root: &Path) -> Condition {
    Condition::All(vec![
        Condition::Within(root.to_path_buf()),
        Condition::not(Condition::test(NODE_MODULES)),
    ])
}

/// The built-in rule table, in declaration order.
pub fn default_rules(root: &Path, inline_limit: u64) -> Vec<AssetRule> {
    use AssetCategory as C;
    use OutputStrategy::{DataUriIfSmall, ExternalFile, Inline};

    vec![
        AssetRule::new("style", Condition::test(r"\.css$"), C::Style)
            .variant(VariantRule::new(
                "inline",
                Condition::All(vec![
                    Condition::query("inline"),
                    Condition::not(Condition::query(URL_QUERY)),
                ]),
                Inline,
            ))
            .variant(VariantRule::new("extract", Condition::Always, ExternalFile)),
        AssetRule::new(
            "script",
            Condition::All(vec![
                Condition::test(r"\.(?:js|mjs|cjs|ts|mts|cts)$"),
                Condition::Any(vec![in_project(root), Condition::test(r"\.(?:ts|mts|cts)$")]),
            ]),
            C::Script,
        )
        .variant(VariantRule::new("compile", Condition::Always, ExternalFile).compiled()),
        AssetRule::new(
            "jsx",
            Condition::All(vec![
                Condition::test(r"\.(?:jsx|tsx)$"),
                Condition::Any(vec![in_project(root), Condition::test(r"\.(?:tsx|jsx)$")]),
            ]),
            C::Script,
        )
        .variant(VariantRule::new("compile", Condition::Always, ExternalFile).compiled()),
        AssetRule::new("vendor-script", Condition::test(r"\.(?:js|mjs|cjs)$"), C::Script)
            .variant(VariantRule::new("vendor", Condition::Always, ExternalFile)),
        AssetRule::new("json", Condition::test(r"\.json$"), C::Json)
            .variant(VariantRule::new("json", Condition::Always, ExternalFile)),
        AssetRule::new(
            "js-data-uri",
            Condition::mime(&["text/javascript", "application/javascript"]),
            C::DataUri,
        )
        .variant(VariantRule::new("script", Condition::Always, Inline).compiled()),
        resource_variants(
            AssetRule::new(
                "image",
                Condition::test(
                    r"(?i)\.(?:png|jpg|jpeg|pjpeg|pjp|gif|bmp|webp|ico|apng|avif|tif|tiff|jfif)$",
                ),
                C::Image,
            ),
            inline_limit,
        ),
        resource_variants(
            AssetRule::new(
                "media",
                Condition::test(r"(?i)\.(?:mp4|webm|ogg|mov|mp3|wav|flac|aac|m4a|opus)$"),
                C::Media,
            ),
            inline_limit,
        ),
        resource_variants(
            AssetRule::new(
                "font",
                Condition::test(r"(?i)\.(?:woff|woff2|eot|ttf|otf|ttc)$"),
                C::Font,
            ),
            inline_limit,
        ),
        AssetRule::new("wasm", Condition::test(r"\.wasm$"), C::Wasm)
            .variant(VariantRule::new("resource", Condition::Always, ExternalFile)),
        AssetRule::new("svg", Condition::test(r"\.svg$"), C::Svg)
            .variant(VariantRule::new("url", Condition::query(URL_QUERY), ExternalFile))
            .variant(VariantRule::new("inline", Condition::query("inline"), Inline))
            .variant(
                VariantRule::new("react", Condition::query("react"), Inline)
                    .component(ComponentExport::Default),
            )
            .variant(
                VariantRule::new(
                    "component",
                    Condition::issuer(SCRIPT_ISSUER),
                    DataUriIfSmall(inline_limit),
                )
                .component(ComponentExport::Named),
            )
            .variant(VariantRule::new(
                "asset",
                Condition::Always,
                DataUriIfSmall(inline_limit),
            )),
        AssetRule::new("data-uri", Condition::test("^data:"), C::DataUri)
            .variant(VariantRule::new("inline", Condition::Always, Inline)),
    ]
}

/// Target of requests no rule accepts.
pub fn opaque_rule() -> AssetRule {
    AssetRule::new("opaque", Condition::Always, AssetCategory::Opaque).variant(VariantRule::new(
        "resource",
        Condition::Always,
        OutputStrategy::ExternalFile,
    ))
}
