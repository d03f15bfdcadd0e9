//! WebSocket Actor
//!
//! Keeps the live-reload connections and broadcasts build results.
//!
//! ```text
//! BuilderActor --[Reload/Error/Clear]--> WsActor --[broadcast]--> Clients
//! acceptor thread --[AddClient]--------^
//! ```

mod client_io;
mod message;
mod server;

pub use message::ReloadMessage;
pub use server::start_ws_server;

use std::net::TcpStream;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tungstenite::WebSocket;
use tungstenite::protocol::Message;

use super::messages::WsMsg;

type Clients = Arc<Mutex<Vec<WebSocket<TcpStream>>>>;

pub struct WsActor {
    rx: mpsc::Receiver<WsMsg>,
    clients: Clients,
    /// Errors of the last failed build, replayed to clients that connect
    /// while it stands.
    pending_error: Arc<Mutex<Option<Vec<String>>>>,
}

impl WsActor {
    pub fn new(rx: mpsc::Receiver<WsMsg>) -> Self {
        Self {
            rx,
            clients: Arc::new(Mutex::new(Vec::new())),
            pending_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Start with the errors of a failed initial build.
    pub fn with_pending_error(self, errors: Vec<String>) -> Self {
        *self.pending_error.lock() = Some(errors);
        self
    }

    pub async fn run(mut self) {
        let clients = Arc::clone(&self.clients);
        std::thread::spawn(move || client_io::reader_loop(&clients));

        while let Some(msg) = self.rx.recv().await {
            match msg {
                WsMsg::Reload => {
                    crate::debug!("ws"; "reload");
                    self.broadcast(&ReloadMessage::Reload);
                }
                WsMsg::Error { errors } => {
                    let msg = ReloadMessage::Error {
                        errors: errors.clone(),
                    };
                    *self.pending_error.lock() = Some(errors);
                    self.broadcast(&msg);
                }
                WsMsg::Clear => {
                    *self.pending_error.lock() = None;
                    self.broadcast(&ReloadMessage::Clear);
                }
                WsMsg::AddClient(stream) => self.add_client(stream),
                WsMsg::Shutdown => {
                    crate::debug!("ws"; "shutting down");
                    for mut ws in self.clients.lock().drain(..) {
                        let _ = ws.close(None);
                    }
                    break;
                }
            }
        }
    }

    /// Send to every client, dropping the ones that fail.
    fn broadcast(&self, msg: &ReloadMessage) {
        let text = Message::Text(msg.to_json().into());
        let mut clients = self.clients.lock();
        let before = clients.len();
        clients.retain_mut(|ws| match ws.send(text.clone()) {
            Ok(()) => true,
            Err(e) => {
                crate::debug!("ws"; "client dropped: {}", e);
                false
            }
        });
        crate::debug!("ws"; "broadcast to {}/{} clients", clients.len(), before);
    }
}
