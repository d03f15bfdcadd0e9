//! Destination collision detection.
//!
//! Two artifacts at the same destination are fine when their bytes are
//! identical (one copy is kept). Different bytes at one destination would
//! silently overwrite output and fail the build.

use rustc_hash::FxHashMap;
use serde::Serialize;

use super::namer::OutputArtifact;
use crate::log;
use crate::utils::plural::plural_s;

/// Distinct contents claiming one destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamingCollision {
    pub destination: String,
    /// Sources claiming the destination, in first-seen order.
    pub sources: Vec<String>,
}

/// Deduplicate identical artifacts and report real collisions.
///
/// The first artifact for each destination is kept. Output order follows
/// first appearance so writes stay deterministic.
pub fn dedupe(artifacts: Vec<OutputArtifact>) -> (Vec<OutputArtifact>, Vec<NamingCollision>) {
    let mut index: FxHashMap<String, usize> = FxHashMap::default();
    let mut kept: Vec<OutputArtifact> = Vec::with_capacity(artifacts.len());
    let mut collisions: Vec<NamingCollision> = Vec::new();

    for artifact in artifacts {
        match index.get(&artifact.destination) {
            None => {
                index.insert(artifact.destination.clone(), kept.len());
                kept.push(artifact);
            }
            Some(&i) if kept[i].bytes == artifact.bytes => {}
            Some(&i) => {
                let destination = artifact.destination.clone();
                match collisions.iter_mut().find(|c| c.destination == destination) {
                    Some(existing) => existing.sources.push(artifact.source),
                    None => collisions.push(NamingCollision {
                        destination,
                        sources: vec![kept[i].source.clone(), artifact.source],
                    }),
                }
            }
        }
    }

    (kept, collisions)
}

/// ```text
/// [error] naming collisions (1 destination)
/// [collision] static/image/logo.png (2 sources)
///   - src/a/logo.png
///   - src/b/logo.png
/// ```
pub fn print_collisions(collisions: &[NamingCollision]) {
    if collisions.is_empty() {
        return;
    }

    log!("error"; "naming collisions ({} destination{})",
        collisions.len(), plural_s(collisions.len()));

    for collision in collisions {
        log!("collision"; "{} ({} source{})",
            collision.destination, collision.sources.len(), plural_s(collision.sources.len()));
        for source in &collision.sources {
            eprintln!("  - {source}");
        }
    }
}
