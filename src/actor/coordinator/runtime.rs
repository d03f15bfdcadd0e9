use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::Receiver;
use tokio::sync::mpsc;

use crate::actor::builder::BuilderActor;
use crate::actor::fs::FsActor;
use crate::actor::messages::{BuildMsg, WsMsg};
use crate::actor::ws::WsActor;
use crate::pipeline::Pipeline;

/// Run all actors concurrently, then stop the builder and the socket
/// actor in order.
pub(super) async fn run_actors(
    fs: FsActor,
    builder: BuilderActor,
    ws: Option<WsActor>,
    build_tx: mpsc::Sender<BuildMsg>,
    ws_tx: Option<mpsc::Sender<WsMsg>>,
    shutdown_rx: Option<Receiver<()>>,
    pipeline: Arc<Pipeline>,
) {
    let fs_handle = tokio::spawn(fs.run());
    let builder_handle = tokio::spawn(builder.run());
    let ws_handle = ws.map(|ws| tokio::spawn(ws.run()));

    match shutdown_rx {
        Some(rx) => loop {
            if rx.try_recv().is_ok() || crate::core::is_shutdown() {
                crate::debug!("actor"; "shutdown signal received");
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        },
        None => {
            let _ = fs_handle.await;
        }
    }

    pipeline.cancel_build();
    let _ = build_tx.send(BuildMsg::Shutdown).await;
    let _ = tokio::time::timeout(Duration::from_secs(2), builder_handle).await;

    if let Some(tx) = ws_tx {
        let _ = tx.send(WsMsg::Shutdown).await;
    }
    if let Some(handle) = ws_handle {
        let _ = tokio::time::timeout(Duration::from_millis(500), handle).await;
    }
}
