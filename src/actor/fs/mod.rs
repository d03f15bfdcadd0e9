//! FileSystem Actor
//!
//! Watches the project and sends debounced changes to the builder.
//! Events are held until the server is up.
//!
//! ```text
//! notify → Debouncer (300 ms, ignore rules) → cancel chains → BuildMsg
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::RecommendedWatcher;
use tokio::sync::mpsc;

use super::messages::BuildMsg;
use crate::pipeline::Pipeline;

mod debouncer;
mod types;
mod watch_roots;


use debouncer::Debouncer;
use types::{ChangeKind, IgnoreRules};
use watch_roots::WatchRoots;

pub struct FsActor {
    notify_rx: std::sync::mpsc::Receiver<notify::Result<notify::Event>>,
    /// Must stay alive for events to flow.
    watcher: RecommendedWatcher,
    watch_roots: WatchRoots,
    builder_tx: mpsc::Sender<BuildMsg>,
    debouncer: Debouncer,
    pipeline: Arc<Pipeline>,
    config_path: PathBuf,
}

impl FsActor {
    pub fn new(
        pipeline: Arc<Pipeline>,
        builder_tx: mpsc::Sender<BuildMsg>,
    ) -> notify::Result<Self> {
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })?;

        let config = pipeline.config();
        let output = config.output_dir().to_path_buf();
        let roots = watch_roots::collect(&config.root, &output, &IgnoreRules::new(&output));
        let mut watch_roots = WatchRoots::new(roots);
        watch_roots.attach_existing(&mut watcher)?;

        Ok(Self {
            notify_rx,
            watcher,
            watch_roots,
            builder_tx,
            debouncer: Debouncer::new(IgnoreRules::new(&output)),
            config_path: config.config_path.clone(),
            pipeline,
        })
    }

    pub async fn run(self) {
        let Self {
            notify_rx,
            mut watcher,
            mut watch_roots,
            builder_tx,
            mut debouncer,
            pipeline,
            config_path,
        } = self;

        let (async_tx, mut async_rx) = mpsc::channel::<notify::Event>(64);

        // notify only offers a blocking receiver
        std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                match result {
                    Ok(event) => {
                        if async_tx.blocking_send(event).is_err() {
                            break;
                        }
                    }
                    Err(e) => crate::log!("watch"; "notify error: {}", e),
                }
            }
        });

        loop {
            tokio::select! {
                biased;
                Some(event) = async_rx.recv() => debouncer.add_event(&event),
                _ = tokio::time::sleep(debouncer.sleep_duration()) => {
                    watch_roots.maintain(&mut watcher);
                    // Hold events until the initial build is out.
                    if !crate::core::is_serving() {
                        continue;
                    }
                    let Some(changes) = debouncer.take_if_ready() else { continue };
                    let Some(msg) = route(&changes, &pipeline, &config_path) else { continue };
                    if builder_tx.send(msg).await.is_err() {
                        break;
                    }
                }
            }
        }
    }
}

/// Turn debounced changes into a builder message, cancelling the chains of
/// every changed source on the way.
fn route(
    changes: &[(PathBuf, ChangeKind)],
    pipeline: &Pipeline,
    config_path: &Path,
) -> Option<BuildMsg> {
    if changes.is_empty() {
        return None;
    }
    log_changes(changes, &pipeline.config().root);

    if !config_path.as_os_str().is_empty() && changes.iter().any(|(p, _)| p == config_path) {
        return Some(BuildMsg::ConfigChanged);
    }

    let changed: Vec<PathBuf> = changes.iter().map(|(p, _)| p.clone()).collect();
    let cancelled = pipeline.cancel_paths(&changed);
    if cancelled > 0 {
        crate::debug!("watch"; "cancelled {} running chain(s)", cancelled);
    }
    Some(BuildMsg::Rebuild { changed })
}

fn log_changes(changes: &[(PathBuf, ChangeKind)], root: &Path) {
    match changes {
        [(path, kind)] => {
            let rel = path.strip_prefix(root).unwrap_or(path);
            crate::log!("watch"; "{} {}", kind.label(), rel.display());
        }
        _ => crate::log!("watch"; "{} files changed", changes.len()),
    }
}
