//! Live-reload wire format.
//!
//! ```json
//! {"type": "connected", "version": "0.1.0"}
//! {"type": "reload"}
//! {"type": "error", "errors": ["src/App.tsx: syntax-parse: ..."]}
//! {"type": "clear"}
//! ```

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReloadMessage {
    Connected { version: &'static str },
    Reload,
    Error { errors: Vec<String> },
    Clear,
}

impl ReloadMessage {
    pub fn connected() -> Self {
        Self::Connected {
            version: env!("CARGO_PKG_VERSION"),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"type":"reload"}"#.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        assert_eq!(ReloadMessage::Reload.to_json(), r#"{"type":"reload"}"#);
        assert_eq!(ReloadMessage::Clear.to_json(), r#"{"type":"clear"}"#);
        assert_eq!(
            ReloadMessage::Error {
                errors: vec!["src/a.ts: resolve: x".into()]
            }
            .to_json(),
            r#"{"type":"error","errors":["src/a.ts: resolve: x"]}"#
        );
        assert!(
            ReloadMessage::connected()
                .to_json()
                .starts_with(r#"{"type":"connected","version":"#)
        );
    }
}
