//! Asset category definitions.

use serde::Serialize;

/// Category of a module, decides which transform chain it runs through
/// and which `static/<dir>/` it is emitted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssetCategory {
    /// JavaScript / TypeScript / JSX source.
    Script,
    /// CSS stylesheet.
    Style,
    /// Raster image.
    Image,
    /// Audio or video.
    Media,
    /// Web font.
    Font,
    /// WebAssembly binary module.
    Wasm,
    /// Vector graphic (SVG).
    Svg,
    /// JSON data module.
    Json,
    /// Inline `data:` resource.
    DataUri,
    /// Unclassified resource, emitted verbatim.
    Opaque,
}

impl AssetCategory {
    pub const ALL: [Self; 10] = [
        Self::Script,
        Self::Style,
        Self::Image,
        Self::Media,
        Self::Font,
        Self::Wasm,
        Self::Svg,
        Self::Json,
        Self::DataUri,
        Self::Opaque,
    ];

    /// Output directory under `static/`.
    pub const fn dir(self) -> &'static str {
        match self {
            Self::Script | Self::Json | Self::DataUri => "js",
            Self::Style => "css",
            Self::Image => "image",
            Self::Media => "media",
            Self::Font => "font",
            Self::Wasm => "wasm",
            Self::Svg => "svg",
            Self::Opaque => "assets",
        }
    }

    /// Display name used in logs and progress counters.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Script => "script",
            Self::Style => "style",
            Self::Image => "image",
            Self::Media => "media",
            Self::Font => "font",
            Self::Wasm => "wasm",
            Self::Svg => "svg",
            Self::Json => "json",
            Self::DataUri => "data-uri",
            Self::Opaque => "opaque",
        }
    }

    /// Categories whose bytes are emitted as standalone resources.
    pub const fn is_resource(self) -> bool {
        matches!(
            self,
            Self::Image | Self::Media | Self::Font | Self::Wasm | Self::Svg | Self::Opaque
        )
    }
}

impl std::fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_dirs() {
        assert_eq!(AssetCategory::Script.dir(), "js");
        assert_eq!(AssetCategory::Style.dir(), "css");
        assert_eq!(AssetCategory::Image.dir(), "image");
        assert_eq!(AssetCategory::Media.dir(), "media");
        assert_eq!(AssetCategory::Font.dir(), "font");
        assert_eq!(AssetCategory::Svg.dir(), "svg");
        assert_eq!(AssetCategory::Wasm.dir(), "wasm");
        assert_eq!(AssetCategory::Opaque.dir(), "assets");
    }

    #[test]
    fn test_is_resource() {
        assert!(AssetCategory::Image.is_resource());
        assert!(AssetCategory::Svg.is_resource());
        assert!(!AssetCategory::Script.is_resource());
        assert!(!AssetCategory::Style.is_resource());
        assert!(!AssetCategory::Json.is_resource());
    }
}
