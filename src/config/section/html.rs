//! `[html]` section configuration.
//!
//! ```toml
//! [html]
//! template = "index.html"     # Falls back to a built-in page when missing
//! title = "app"
//!
//! [html.meta]
//! viewport = "width=device-width, initial-scale=1.0"
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HtmlConfig {
    /// Emit `index.html` at all.
    pub enable: bool,

    /// Template path relative to the project root.
    pub template: PathBuf,

    /// Output file name inside the output directory.
    pub filename: String,

    pub title: String,

    /// `<meta name=.. content=..>` tags added to `<head>`.
    pub meta: BTreeMap<String, String>,

    /// Entries whose chunks are referenced by the page.
    pub chunks: Vec<String>,
}

impl Default for HtmlConfig {
    fn default() -> Self {
        Self {
            enable: true,
            template: "index.html".into(),
            filename: "index.html".into(),
            title: "rivet app".into(),
            meta: BTreeMap::from([(
                "viewport".to_string(),
                "width=device-width, initial-scale=1.0".to_string(),
            )]),
            chunks: vec!["index".into()],
        }
    }
}
