//! `[resolve]` section configuration.
//!
//! ```toml
//! [resolve]
//! extensions = [".app.ts", ".app.tsx", ".ts", ".tsx", ".mjs", ".js", ".jsx", ".json"]
//!
//! [resolve.alias]
//! "@" = "./src"
//!
//! [resolve.extension_alias]
//! ".js" = [".ts", ".tsx", ".js"]
//!
//! [resolve.fallback]
//! fs = false                  # Resolve to an empty module
//! path = "path-browserify"    # Resolve to a browser package
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::ConfigDiagnostics;

/// Replacement for a Node built-in when bundling for the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Fallback {
    /// `false` resolves to an empty module.
    Disabled(bool),
    /// Bare specifier of a browser implementation.
    Module(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveConfig {
    /// Specifier prefix -> path relative to the project root.
    pub alias: BTreeMap<String, String>,

    /// Suffixes probed, in order, for specifiers without one.
    pub extensions: Vec<String>,

    /// Written extension -> extensions actually probed.
    pub extension_alias: BTreeMap<String, Vec<String>>,

    /// `package.json` fields consulted for a package entry, in order.
    pub main_fields: Vec<String>,

    /// Node built-in -> browser replacement.
    pub fallback: BTreeMap<String, Fallback>,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            alias: BTreeMap::from([("@".to_string(), "./src".to_string())]),
            extensions: [".app.ts", ".app.tsx", ".ts", ".tsx", ".mjs", ".js", ".jsx", ".json"]
                .map(String::from)
                .to_vec(),
            extension_alias: BTreeMap::from([
                (".js".to_string(), [".ts", ".tsx", ".js"].map(String::from).to_vec()),
                (".jsx".to_string(), [".tsx", ".jsx"].map(String::from).to_vec()),
            ]),
            main_fields: ["browser", "module", "main"].map(String::from).to_vec(),
            fallback: default_fallbacks(),
        }
    }
}

/// Browser replacements for Node built-ins, as published by node-stdlib-browser.
fn default_fallbacks() -> BTreeMap<String, Fallback> {
    const MODULES: &[(&str, &str)] = &[
        ("assert", "assert/"),
        ("buffer", "buffer/"),
        ("console", "console-browserify"),
        ("constants", "constants-browserify"),
        ("crypto", "crypto-browserify"),
        ("domain", "domain-browser"),
        ("events", "events/"),
        ("http", "stream-http"),
        ("https", "https-browserify"),
        ("os", "os-browserify/browser.js"),
        ("path", "path-browserify"),
        ("punycode", "punycode/"),
        ("process", "process/browser.js"),
        ("querystring", "querystring-es3"),
        ("stream", "stream-browserify"),
        ("_stream_duplex", "readable-stream/lib/_stream_duplex.js"),
        ("_stream_passthrough", "readable-stream/lib/_stream_passthrough.js"),
        ("_stream_readable", "readable-stream/lib/_stream_readable.js"),
        ("_stream_transform", "readable-stream/lib/_stream_transform.js"),
        ("_stream_writable", "readable-stream/lib/_stream_writable.js"),
        ("string_decoder", "string_decoder/"),
        ("sys", "util/"),
        ("timers", "timers-browserify"),
        ("timers/promises", "isomorphic-timers-promises"),
        ("tty", "tty-browserify"),
        ("url", "url/"),
        ("util", "util/"),
        ("vm", "vm-browserify"),
        ("zlib", "browserify-zlib"),
    ];

    let mut map: BTreeMap<String, Fallback> = MODULES
        .iter()
        .map(|(name, target)| (name.to_string(), Fallback::Module(target.to_string())))
        .collect();
    map.insert("fs".into(), Fallback::Disabled(false));
    map
}

impl ResolveConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        for ext in self.extensions.iter().chain(self.extension_alias.keys()) {
            if !ext.starts_with('.') {
                diag.error_with_hint(
                    "resolve.extensions",
                    format!("extension `{ext}` must start with a dot"),
                    format!("use `.{ext}`"),
                );
            }
        }
        for (name, fallback) in &self.fallback {
            if let Fallback::Module(target) = fallback
                && target.is_empty()
            {
                diag.error_with_hint(
                    format!("resolve.fallback.{name}"),
                    "fallback module must not be empty",
                    "use `false` for an empty module",
                );
            }
        }
    }
}
