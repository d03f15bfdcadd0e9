//! Deterministic output paths.
//!
//! ```text
//! development   static/<dir>/<name>.<ext>
//! production    static/<dir>/<name>.<hash8>.<ext>
//! wasm          static/wasm/<name|hash8>.module.wasm
//! ```
//!
//! The hash covers the final transformed bytes, so a transform change moves
//! the file even when the source is untouched.

use serde::Serialize;

use super::hash::ContentHash;
use crate::core::{AssetCategory, BuildMode};

/// A file ready to be written under the output directory.
#[derive(Debug, Clone, Serialize)]
pub struct OutputArtifact {
    /// Module id or chunk name the bytes came from.
    pub source: String,
    pub category: AssetCategory,
    /// Path relative to the output directory, `/`-separated.
    pub destination: String,
    /// Present in production only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl OutputArtifact {
    /// Name `bytes` and wrap them as an artifact.
    pub fn emit(
        source: impl Into<String>,
        category: AssetCategory,
        stem: &str,
        ext: &str,
        bytes: Vec<u8>,
        mode: BuildMode,
    ) -> Self {
        let hash = ContentHash::of(&bytes);
        Self {
            source: source.into(),
            category,
            destination: name(category, stem, ext, hash, mode),
            content_hash: mode.hashed_names().then(|| hash.short()),
            bytes,
        }
    }

    /// Public URL of this artifact under `public_path`.
    pub fn url(&self, public_path: &str) -> String {
        format!("{public_path}{}", self.destination)
    }
}

/// Compute the destination for bytes with hash `hash`.
pub fn name(
    category: AssetCategory,
    stem: &str,
    ext: &str,
    hash: ContentHash,
    mode: BuildMode,
) -> String {
    let stem = sanitize(stem);
    let dir = category.dir();

    if category == AssetCategory::Wasm {
        let id = if mode.hashed_names() { hash.short() } else { stem };
        return format!("static/{dir}/{id}.module.wasm");
    }

    let ext = ext.trim_start_matches('.');
    let suffix = if ext.is_empty() { String::new() } else { format!(".{ext}") };
    if mode.hashed_names() {
        format!("static/{dir}/{stem}.{}{suffix}", hash.short())
    } else {
        format!("static/{dir}/{stem}{suffix}")
    }
}

/// Keep names filesystem- and URL-safe.
fn sanitize(stem: &str) -> String {
    let cleaned: String = stem
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' | '@' => c,
            _ => '_',
        })
        .collect();
    if cleaned.is_empty() { "_".to_string() } else { cleaned }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn font(source: &str, bytes: Vec<u8>) -> OutputArtifact {
        let mode = BuildMode::Production;
        OutputArtifact::emit(source, AssetCategory::Font, "Inter", "woff2", bytes, mode)
    }

    #[test]
    fn test_development_names_are_stable() {
        let hash = ContentHash::of(b"png bytes");
        assert_eq!(
            name(AssetCategory::Image, "photo", "png", hash, BuildMode::Development),
            "static/image/photo.png"
        );
        assert_eq!(
            name(AssetCategory::Script, "index", "js", hash, BuildMode::Development),
            "static/js/index.js"
        );
    }

    #[test]
    fn test_production_names_carry_hash() {
        let bytes = vec![7u8; 10_000];
        let artifact = OutputArtifact::emit(
            "src/photo.png",
            AssetCategory::Image,
            "photo",
            "png",
            bytes.clone(),
            BuildMode::Production,
        );
        let hash8 = ContentHash::of(&bytes).short();
        assert_eq!(artifact.destination, format!("static/image/photo.{hash8}.png"));
        assert_eq!(artifact.content_hash.as_deref(), Some(hash8.as_str()));
    }

    #[test]
    fn test_identical_bytes_identical_path() {
        let a = font("a", vec![1, 2]);
        let b = font("b", vec![1, 2]);
        let c = font("c", vec![1, 3]);
        assert_eq!(a.destination, b.destination);
        assert_ne!(a.destination, c.destination);
    }

    #[test]
    fn test_wasm_layout() {
        let hash = ContentHash::of(b"\0asm");
        assert_eq!(
            name(AssetCategory::Wasm, "core_bg", "wasm", hash, BuildMode::Production),
            format!("static/wasm/{}.module.wasm", hash.short())
        );
        assert_eq!(
            name(AssetCategory::Wasm, "core_bg", "wasm", hash, BuildMode::Development),
            "static/wasm/core_bg.module.wasm"
        );
    }

    #[test]
    fn test_development_has_no_hash() {
        let artifact = OutputArtifact::emit(
            "x",
            AssetCategory::Style,
            "index",
            "css",
            b"a{}".to_vec(),
            BuildMode::Development,
        );
        assert!(artifact.content_hash.is_none());
        assert_eq!(artifact.url("/"), "/static/css/index.css");
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("my file"), "my_file");
        assert_eq!(sanitize(""), "_");
        assert_eq!(sanitize("lib-react"), "lib-react");
    }
}
