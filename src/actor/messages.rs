//! Actor message definitions.
//!
//! ```text
//! FsActor --Rebuild--> BuilderActor --Reload/Error--> WsActor
//! ```

use std::net::TcpStream;
use std::path::PathBuf;

/// Messages to the builder actor.
#[derive(Debug)]
pub enum BuildMsg {
    /// Sources changed; their in-flight chains are already cancelled.
    Rebuild { changed: Vec<PathBuf> },
    /// `rivet.toml` changed.
    ConfigChanged,
    Shutdown,
}

/// Messages to the WebSocket actor.
#[derive(Debug)]
pub enum WsMsg {
    /// Full page reload.
    Reload,
    /// Build failed; show the overlay.
    Error { errors: Vec<String> },
    /// Build recovered; hide the overlay.
    Clear,
    /// Freshly accepted connection, handshake pending.
    AddClient(TcpStream),
    Shutdown,
}
