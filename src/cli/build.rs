//! `rivet build`: one-shot production build.
//!
//! - **Init** - pipeline over the loaded config, bindings resolved once
//! - **Build** - graph, chunks, output, `index.html`
//! - **Report** - warnings, errors, collisions, advisory diagnostics
//!
//! Exits non-zero when any file failed to transform or two outputs
//! collided.

use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};

use crate::config::ProjectConfig;
use crate::core::BuildMode;
use crate::log;
use crate::pipeline::{Pipeline, print_diagnostics};
use crate::utils::plural::plural_count;

/// Wait for advisory checks queued by the build.
const CHECK_WAIT: Duration = Duration::from_secs(10);

pub fn run_build(config: &ProjectConfig) -> Result<()> {
    let started = Instant::now();
    let pipeline =
        Pipeline::new(config, BuildMode::Production).context("Failed to set up the build")?;
    crate::debug_do! {
        for binding in pipeline.bindings().iter() {
            log!("define"; "{} = {}", binding.token, binding.value);
        }
    }

    let report = pipeline.build(false).context("Build failed")?;
    report.print();
    print_diagnostics(&pipeline.diagnostics(CHECK_WAIT));

    if report.is_failed() {
        bail!(
            "build failed: {}, {}",
            plural_count(report.errors.len(), "error"),
            plural_count(report.collisions.len(), "naming collision")
        );
    }

    log!(
        "build";
        "{} in {:.2}s -> {}",
        report.summary(),
        started.elapsed().as_secs_f64(),
        config.output_dir().display()
    );
    Ok(())
}
