//! `rivet serve`: development build, watch loop, static server with live
//! reload.
//!
//! ```text
//! initial build ─► set_serving ─► actors (watch ─► rebuild ─► ws)
//!                      │
//!                      └─► request loop (tiny_http, rayon pool)
//! ```

mod lifecycle;
mod path;
mod response;

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam::channel;
use tiny_http::{Request, Server};

use crate::config::ProjectConfig;
use crate::core::{BuildMode, is_busy, is_shutdown, register_server, set_serving};
use crate::embed::serve::LIVERELOAD_PATH;
use crate::logger::{status_error, status_success};
use crate::pipeline::Pipeline;
use crate::{debug, log};

/// Live-reload port actually bound; may differ from `serve.ws_port`.
static ACTUAL_WS_PORT: AtomicU16 = AtomicU16::new(0);

pub fn set_actual_ws_port(port: u16) {
    ACTUAL_WS_PORT.store(port, Ordering::Relaxed);
}

/// How long an HTML request waits for a running rebuild.
const BUSY_WAIT: Duration = Duration::from_secs(5);

const REQUEST_THREADS: usize = 4;

/// Settings the request handlers need.
struct ServeState {
    output: std::path::PathBuf,
    live_reload: bool,
}

impl ServeState {
    fn ws_port(&self) -> Option<u16> {
        self.live_reload.then(|| ACTUAL_WS_PORT.load(Ordering::Relaxed))
    }
}

pub fn run_serve(config: &ProjectConfig) -> Result<()> {
    let pipeline = Arc::new(
        Pipeline::new(config, BuildMode::Development).context("Failed to set up the build")?,
    );

    let report = pipeline.build(false).context("Initial build failed")?;
    report.print();
    let initial_errors = report.error_lines();
    if report.is_failed() {
        status_error(&format!("build failed: {}", report.summary()), "");
    } else {
        status_success(&report.summary());
    }
    set_serving();

    let (server, addr) = lifecycle::bind_with_retry(config.serve.interface, config.serve.port)?;
    let server = Arc::new(server);
    let (shutdown_tx, shutdown_rx) = channel::unbounded::<()>();
    register_server(Arc::clone(&server), shutdown_tx);
    log!("serve"; "http://{}", display_addr(addr));

    let live_reload = config.serve.watch;
    let actors = live_reload.then(|| {
        set_actual_ws_port(config.serve.ws_port);
        lifecycle::spawn_actors(
            Arc::clone(&pipeline),
            Some(config.serve.ws_port),
            initial_errors,
            shutdown_rx,
        )
    });

    let state = Arc::new(ServeState {
        output: config.output_dir().to_path_buf(),
        live_reload,
    });
    run_request_loop(&server, &state)?;
    lifecycle::wait_for_shutdown(actors);
    Ok(())
}

fn display_addr(addr: SocketAddr) -> String {
    if addr.ip().is_unspecified() {
        format!("localhost:{}", addr.port())
    } else {
        addr.to_string()
    }
}

fn run_request_loop(server: &Server, state: &Arc<ServeState>) -> Result<()> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(REQUEST_THREADS)
        .thread_name(|i| format!("rivet-http-{i}"))
        .build()
        .context("Failed to create request thread pool")?;

    for request in server.incoming_requests() {
        let state = Arc::clone(state);
        pool.spawn(move || {
            if let Err(e) = handle_request(request, &state) {
                debug!("serve"; "request error: {e}");
            }
        });
    }
    Ok(())
}

fn handle_request(request: Request, state: &ServeState) -> Result<()> {
    if is_shutdown() {
        return response::respond_unavailable(request);
    }

    let ws_port = state.ws_port();
    let url = request.url().to_string();
    if let Some(port) = ws_port
        && url.split('?').next() == Some(LIVERELOAD_PATH)
    {
        return response::respond_livereload_js(request, port);
    }

    if let Some(path) = path::resolve_path(&url, &state.output) {
        if crate::utils::mime::is_html(crate::utils::mime::from_path(&path)) {
            wait_while_busy();
        }
        return response::respond_file(request, &path, ws_port);
    }

    if path::is_history_route(&url) {
        let index = state.output.join("index.html");
        if index.is_file() {
            wait_while_busy();
            return response::respond_file(request, &index, ws_port);
        }
    }

    response::respond_not_found(request)
}

/// A reload right after a change should see the new build.
fn wait_while_busy() {
    let deadline = Instant::now() + BUSY_WAIT;
    while is_busy() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(20));
    }
}
