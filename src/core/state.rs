//! Process state for serve mode.
//!
//! Three orthogonal flags:
//! - `SERVING`: initial build finished, requests are served from `dist/`
//! - `BUSY`: a rebuild is in progress
//! - `SHUTDOWN`: Ctrl+C received

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use tiny_http::Server;

static SERVING: AtomicBool = AtomicBool::new(false);

static BUSY: AtomicBool = AtomicBool::new(false);

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// HTTP server reference for graceful shutdown
static SERVER: OnceLock<Arc<Server>> = OnceLock::new();

/// Shutdown signal sender for the actor system
static SHUTDOWN_TX: OnceLock<crossbeam::channel::Sender<()>> = OnceLock::new();

pub fn is_serving() -> bool {
    SERVING.load(Ordering::SeqCst)
}

/// Mark the output as ready to serve (call after the initial build)
pub fn set_serving() {
    SERVING.store(true, Ordering::SeqCst);
}

pub fn is_busy() -> bool {
    BUSY.load(Ordering::Acquire)
}

pub fn begin_update() {
    BUSY.store(true, Ordering::Release);
}

pub fn end_update() {
    BUSY.store(false, Ordering::Release);
}

/// Install the global Ctrl+C handler. Call once at program start.
///
/// Before `register_server()` the process exits immediately; afterwards the
/// server is unblocked and the actors are notified.
pub fn setup_shutdown_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        SHUTDOWN.store(true, Ordering::SeqCst);

        if let Some(tx) = SHUTDOWN_TX.get() {
            let _ = tx.send(());
        }

        if let Some(server) = SERVER.get() {
            crate::log!("serve"; "shutting down...");
            server.unblock();
        } else {
            std::process::exit(0);
        }
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}

/// Register the HTTP server for graceful shutdown
pub fn register_server(server: Arc<Server>, shutdown_tx: crossbeam::channel::Sender<()>) {
    let _ = SERVER.set(server);
    let _ = SHUTDOWN_TX.set(shutdown_tx);
}

pub fn is_shutdown() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}
