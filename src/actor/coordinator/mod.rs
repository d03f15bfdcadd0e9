//! Actor Coordinator
//!
//! Creates the channels, starts the live-reload listener, and runs the
//! actors until shutdown.

mod runtime;

use std::sync::Arc;

use anyhow::Result;
use crossbeam::channel::Receiver;
use tokio::sync::mpsc;

use super::builder::BuilderActor;
use super::fs::FsActor;
use super::messages::{BuildMsg, WsMsg};
use super::ws::{WsActor, start_ws_server};
use crate::pipeline::Pipeline;

const CHANNEL_BUFFER: usize = 32;

pub struct Coordinator {
    pipeline: Arc<Pipeline>,
    ws_port: Option<u16>,
    /// Errors of the initial build, if it failed.
    initial_errors: Option<Vec<String>>,
    shutdown_rx: Option<Receiver<()>>,
}

impl Coordinator {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self {
            pipeline,
            ws_port: None,
            initial_errors: None,
            shutdown_rx: None,
        }
    }

    pub fn with_ws_port(mut self, port: u16) -> Self {
        self.ws_port = Some(port);
        self
    }

    pub fn with_initial_errors(mut self, errors: Vec<String>) -> Self {
        self.initial_errors = (!errors.is_empty()).then_some(errors);
        self
    }

    pub fn with_shutdown_signal(mut self, rx: Receiver<()>) -> Self {
        self.shutdown_rx = Some(rx);
        self
    }

    /// Run until the shutdown signal fires or an actor stops.
    ///
    /// `on_ws_bound` receives the live-reload port actually bound, which
    /// may differ from the requested one.
    pub async fn run(mut self, on_ws_bound: impl FnOnce(u16)) -> Result<()> {
        let (build_tx, build_rx) = mpsc::channel::<BuildMsg>(CHANNEL_BUFFER);

        let ws = match self.ws_port {
            Some(port) => {
                let (ws_tx, ws_rx) = mpsc::channel::<WsMsg>(CHANNEL_BUFFER);
                let interface = self.pipeline.config().serve.interface;
                match start_ws_server(interface, port, ws_tx.clone()) {
                    Ok(bound) => {
                        crate::debug!("ws"; "ws://{}:{}", interface, bound);
                        on_ws_bound(bound);
                        let mut actor = WsActor::new(ws_rx);
                        if let Some(errors) = self.initial_errors.clone() {
                            actor = actor.with_pending_error(errors);
                        }
                        Some((actor, ws_tx))
                    }
                    Err(e) => {
                        crate::log!("ws"; "live reload disabled: {}", e);
                        None
                    }
                }
            }
            None => None,
        };

        let fs = FsActor::new(Arc::clone(&self.pipeline), build_tx.clone())
            .map_err(|e| anyhow::anyhow!("watcher failed: {}", e))?;
        let (ws_actor, ws_tx) = ws.unzip();
        let builder = BuilderActor::new(
            build_rx,
            ws_tx.clone(),
            Arc::clone(&self.pipeline),
            self.initial_errors.is_some(),
        );

        crate::debug!("actor"; "start");
        runtime::run_actors(
            fs,
            builder,
            ws_actor,
            build_tx,
            ws_tx,
            self.shutdown_rx.take(),
            self.pipeline,
        )
        .await;
        crate::debug!("actor"; "stopped");
        Ok(())
    }
}
