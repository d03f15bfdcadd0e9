use std::net::TcpStream;
use std::time::Duration;

use tungstenite::protocol::Message;

use super::{Clients, ReloadMessage, WsActor};

impl WsActor {
    /// Complete the handshake, greet, and replay a standing error.
    pub(super) fn add_client(&self, stream: TcpStream) {
        // Handshake in blocking mode, poll reads afterwards.
        let mut ws = match tungstenite::accept(stream) {
            Ok(ws) => ws,
            Err(e) => {
                crate::log!("ws"; "handshake failed: {}", e);
                return;
            }
        };
        let _ = ws.get_ref().set_nonblocking(true);

        if let Err(e) = ws.send(Message::Text(ReloadMessage::connected().to_json().into())) {
            crate::debug!("ws"; "greeting failed: {}", e);
            return;
        }

        if let Some(errors) = self.pending_error.lock().clone() {
            let msg = ReloadMessage::Error { errors };
            if let Err(e) = ws.send(Message::Text(msg.to_json().into())) {
                crate::debug!("ws"; "replaying error failed: {}", e);
                return;
            }
        }

        let mut clients = self.clients.lock();
        clients.push(ws);
        crate::debug!("ws"; "client connected (total: {})", clients.len());
    }
}

/// Poll clients for close frames and dead sockets. Clients send nothing
/// else worth reading.
pub(super) fn reader_loop(clients: &Clients) {
    loop {
        std::thread::sleep(Duration::from_millis(100));
        if crate::core::is_shutdown() {
            break;
        }

        let mut clients = clients.lock();
        clients.retain_mut(|ws| match ws.read() {
            Ok(Message::Close(_)) => false,
            Ok(_) => true,
            Err(tungstenite::Error::Io(ref e)) if e.kind() == std::io::ErrorKind::WouldBlock => {
                true
            }
            Err(_) => false,
        });
    }
}
