//! Resource stages: strategy selection and data URIs.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

use crate::classify::OutputStrategy;
use crate::utils::mime;

/// Characters escaped in a UTF-8 SVG data URI.
const SVG_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Whether bytes of `size` are embedded under `strategy`.
pub const fn should_inline(strategy: OutputStrategy, size: u64) -> bool {
    match strategy {
        OutputStrategy::Inline => true,
        OutputStrategy::ExternalFile => false,
        OutputStrategy::DataUriIfSmall(limit) => size <= limit,
    }
}

/// Strategy named by a `select-strategy` stage's options.
pub fn strategy_from(name: Option<&str>, threshold: Option<u64>) -> OutputStrategy {
    match (name, threshold) {
        (Some("inline"), _) => OutputStrategy::Inline,
        (Some("data-uri-if-small"), Some(limit)) => OutputStrategy::DataUriIfSmall(limit),
        _ => OutputStrategy::ExternalFile,
    }
}

/// Encode bytes as a data URI. SVG stays readable text, everything else
/// is base64.
pub fn data_uri(mime_type: &str, bytes: &[u8]) -> String {
    let essence = mime::essence(mime_type);
    if essence == mime::types::SVG
        && let Ok(text) = std::str::from_utf8(bytes)
    {
        return format!("data:{essence},{}", utf8_percent_encode(text, SVG_ESCAPE));
    }
    format!("data:{essence};base64,{}", STANDARD.encode(bytes))
}

/// A parsed `data:` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Decode `data:[<mime>][;base64],<data>`.
pub fn parse_data_uri(uri: &str) -> Option<DataUri> {
    let rest = uri.strip_prefix("data:")?;
    let (meta, data) = rest.split_once(',')?;
    let (mime, base64) = match meta.strip_suffix(";base64") {
        Some(mime) => (mime, true),
        None => (meta, false),
    };
    let bytes = if base64 {
        STANDARD.decode(data.trim()).ok()?
    } else {
        percent_encoding::percent_decode_str(data).collect()
    };
    let mime = if mime.is_empty() { "text/plain" } else { mime };
    Some(DataUri {
        mime: mime.to_string(),
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_inline() {
        assert!(should_inline(OutputStrategy::Inline, 1_000_000));
        assert!(!should_inline(OutputStrategy::ExternalFile, 1));
        assert!(should_inline(OutputStrategy::DataUriIfSmall(4096), 4096));
        assert!(!should_inline(OutputStrategy::DataUriIfSmall(4096), 10_000));
    }

    #[test]
    fn test_strategy_from_options() {
        assert_eq!(strategy_from(Some("inline"), None), OutputStrategy::Inline);
        assert_eq!(
            strategy_from(Some("data-uri-if-small"), Some(10)),
            OutputStrategy::DataUriIfSmall(10)
        );
        assert_eq!(strategy_from(Some("external-file"), None), OutputStrategy::ExternalFile);
    }

    #[test]
    fn test_data_uri_encoding() {
        assert_eq!(data_uri("image/png", &[0, 1, 2]), "data:image/png;base64,AAEC");
        let svg = data_uri(mime::types::SVG, br#"<svg a="1"/>"#);
        assert_eq!(svg, "data:image/svg+xml,%3Csvg%20a=%221%22/%3E");
    }

    #[test]
    fn test_parse_data_uri() {
        let uri = parse_data_uri("data:text/javascript;base64,ZXhwb3J0IHt9").unwrap();
        assert_eq!(uri.mime, "text/javascript");
        assert_eq!(uri.bytes, b"export {}");

        let plain = parse_data_uri("data:,hello%20world").unwrap();
        assert_eq!(plain.mime, "text/plain");
        assert_eq!(plain.bytes, b"hello world");

        assert!(parse_data_uri("file:///x").is_none());
    }
}
