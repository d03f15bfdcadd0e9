//! Builder Actor
//!
//! Runs watch rebuilds one at a time on the blocking pool. Messages that
//! queue up during a build collapse into a single rebuild, and a build
//! superseded by a newer change is rerun until one completes.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use super::messages::{BuildMsg, WsMsg};
use crate::logger::{status_error, status_success, status_warning};
use crate::pipeline::{BuildReport, Pipeline};

/// Give up after this many superseded builds in a row.
const MAX_RERUNS: usize = 8;

pub struct BuilderActor {
    rx: mpsc::Receiver<BuildMsg>,
    ws_tx: Option<mpsc::Sender<WsMsg>>,
    pipeline: Arc<Pipeline>,
    /// Last build ended with errors on screen.
    failing: bool,
}

impl BuilderActor {
    pub fn new(
        rx: mpsc::Receiver<BuildMsg>,
        ws_tx: Option<mpsc::Sender<WsMsg>>,
        pipeline: Arc<Pipeline>,
        failing: bool,
    ) -> Self {
        Self {
            rx,
            ws_tx,
            pipeline,
            failing,
        }
    }

    pub async fn run(mut self) {
        while let Some(msg) = self.rx.recv().await {
            match msg {
                BuildMsg::Rebuild { changed } => {
                    let mut count = changed.len();
                    // Fold whatever arrived meanwhile into this build.
                    while let Ok(next) = self.rx.try_recv() {
                        match next {
                            BuildMsg::Rebuild { changed } => count += changed.len(),
                            BuildMsg::ConfigChanged => warn_config_changed(),
                            BuildMsg::Shutdown => return,
                        }
                    }
                    crate::debug!("build"; "rebuild for {} change(s)", count);
                    self.rebuild().await;
                }
                BuildMsg::ConfigChanged => warn_config_changed(),
                BuildMsg::Shutdown => break,
            }
        }
        crate::debug!("build"; "builder stopped");
    }

    async fn rebuild(&mut self) {
        crate::core::begin_update();
        let report = self.build_until_complete().await;
        crate::core::end_update();

        match report {
            Some(report) => self.publish(&report).await,
            None => status_warning("sources keep changing, waiting for the next change"),
        }
    }

    async fn build_until_complete(&self) -> Option<BuildReport> {
        for _ in 0..MAX_RERUNS {
            let pipeline = Arc::clone(&self.pipeline);
            let result = tokio::task::spawn_blocking(move || pipeline.build(true)).await;
            match result {
                Ok(Ok(report)) if report.is_superseded() => {
                    crate::debug!("build"; "superseded, rerunning");
                }
                Ok(Ok(report)) => return Some(report),
                Ok(Err(e)) => {
                    status_error("build failed", &format!("{:#}", anyhow::Error::from(e)));
                    return None;
                }
                Err(e) => {
                    status_error("build task panicked", &e.to_string());
                    return None;
                }
            }
        }
        None
    }

    async fn publish(&mut self, report: &BuildReport) {
        for warning in &report.warnings {
            crate::debug!("warn"; "{warning}");
        }
        // Checker findings are logged as they arrive; drop the backlog.
        let _ = self.pipeline.diagnostics(Duration::ZERO);

        if report.is_failed() {
            let lines = report.error_lines();
            status_error(&format!("build failed: {}", report.summary()), &lines.join("\n"));
            self.send(WsMsg::Error { errors: lines }).await;
            self.failing = true;
            return;
        }

        status_success(&report.summary());
        if self.failing {
            self.send(WsMsg::Clear).await;
            self.failing = false;
        }
        self.send(WsMsg::Reload).await;
    }

    async fn send(&self, msg: WsMsg) {
        if let Some(tx) = &self.ws_tx
            && tx.send(msg).await.is_err()
        {
            crate::debug!("build"; "websocket actor gone");
        }
    }
}

fn warn_config_changed() {
    status_warning("rivet.toml changed, restart `rivet serve` to apply it");
}
