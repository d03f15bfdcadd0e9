//! Server lifecycle management.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::Result;
use crossbeam::channel::Receiver;
use tiny_http::Server;

use crate::actor::Coordinator;
use crate::log;
use crate::pipeline::Pipeline;

const MAX_PORT_RETRIES: u16 = 10;

/// Bind `interface:base_port`, moving up when the port is taken.
pub fn bind_with_retry(interface: IpAddr, base_port: u16) -> Result<(Server, SocketAddr)> {
    let mut last_error = None;
    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);
        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                let addr = server.server_addr().to_ip().unwrap_or(addr);
                return Ok((server, addr));
            }
            Err(e) => last_error = Some(e),
        }
    }
    Err(anyhow::anyhow!(
        "failed to bind after {} attempts from port {}: {}",
        MAX_PORT_RETRIES,
        base_port,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

/// Run the watch actors on their own runtime thread.
pub fn spawn_actors(
    pipeline: Arc<Pipeline>,
    ws_port: Option<u16>,
    initial_errors: Vec<String>,
    shutdown_rx: Receiver<()>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let rt = match tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => {
                log!("watch"; "cannot start runtime, watching disabled: {}", e);
                return;
            }
        };

        rt.block_on(async {
            let mut coordinator = Coordinator::new(pipeline)
                .with_initial_errors(initial_errors)
                .with_shutdown_signal(shutdown_rx);
            if let Some(port) = ws_port {
                coordinator = coordinator.with_ws_port(port);
            }
            if let Err(e) = coordinator.run(super::set_actual_ws_port).await {
                log!("watch"; "error: {}", e);
            }
        });
    })
}

/// Give the actors up to two seconds to stop.
pub fn wait_for_shutdown(handle: Option<JoinHandle<()>>) {
    let Some(handle) = handle else { return };

    for _ in 0..40 {
        if handle.is_finished() {
            let _ = handle.join();
            return;
        }
        thread::sleep(Duration::from_millis(50));
    }
}
