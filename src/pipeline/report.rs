//! Build results and their terminal rendering.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::chunk::ChunkingConflict;
use crate::graph::GraphWarning;
use crate::log;
use crate::output::{NamingCollision, print_collisions};
use crate::transform::{TransformError, TypeDiagnostic};
use crate::utils::plural::plural_count;

/// Failures that stop a build before or while writing output. Per-file
/// transform failures are not among them; they land in [`BuildReport`].
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid chunk group pattern")]
    ChunkGroup(#[from] regex::Error),

    #[error("cannot write `{0}`")]
    Io(PathBuf, #[source] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildOutcome {
    Complete,
    /// A source changed mid-build; nothing was written and a rerun is due.
    Superseded,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub outcome: BuildOutcome,
    pub errors: Vec<TransformError>,
    pub collisions: Vec<NamingCollision>,
    pub warnings: Vec<GraphWarning>,
    pub conflicts: Vec<ChunkingConflict>,
    /// Destinations written, relative to the output directory.
    pub written: Vec<String>,
    /// Modules reused from the previous build.
    pub reused: usize,
    pub modules: usize,
}

impl BuildReport {
    pub fn superseded() -> Self {
        Self {
            outcome: BuildOutcome::Superseded,
            errors: Vec::new(),
            collisions: Vec::new(),
            warnings: Vec::new(),
            conflicts: Vec::new(),
            written: Vec::new(),
            reused: 0,
            modules: 0,
        }
    }

    pub fn is_superseded(&self) -> bool {
        self.outcome == BuildOutcome::Superseded
    }

    /// Transform errors or naming collisions occurred.
    pub fn is_failed(&self) -> bool {
        !self.errors.is_empty() || !self.collisions.is_empty()
    }

    /// One line per error and collision, for the dev overlay.
    pub fn error_lines(&self) -> Vec<String> {
        self.errors
            .iter()
            .map(ToString::to_string)
            .chain(self.collisions.iter().map(|c| {
                format!("naming collision at {}: {}", c.destination, c.sources.join(", "))
            }))
            .collect()
    }

    /// Log everything worth a human's attention.
    pub fn print(&self) {
        for warning in &self.warnings {
            log!("warn"; "{warning}");
        }
        for conflict in &self.conflicts {
            crate::debug!("chunk"; "{conflict}");
        }
        for error in &self.errors {
            log!("error"; "{error}");
        }
        print_collisions(&self.collisions);
    }

    pub fn summary(&self) -> String {
        let mut summary = format!(
            "{}, {}",
            plural_count(self.modules, "module"),
            plural_count(self.written.len(), "file")
        );
        if self.reused > 0 {
            summary.push_str(&format!(", {} reused", self.reused));
        }
        if !self.errors.is_empty() {
            summary.push_str(&format!(", {}", plural_count(self.errors.len(), "error")));
        }
        summary
    }
}

/// Log advisory findings. They never affect the outcome.
pub fn print_diagnostics(diagnostics: &[TypeDiagnostic]) {
    if diagnostics.is_empty() {
        return;
    }
    log!("check"; "{}", plural_count(diagnostics.len(), "advisory diagnostic"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{FailedAt, StageName};

    #[test]
    fn test_failed_on_errors_or_collisions() {
        let mut report = BuildReport::superseded();
        report.outcome = BuildOutcome::Complete;
        assert!(!report.is_failed());

        report.collisions.push(NamingCollision {
            destination: "static/image/a.png".into(),
            sources: vec!["src/a/a.png".into(), "src/b/a.png".into()],
        });
        assert!(report.is_failed());
        assert_eq!(
            report.error_lines(),
            vec!["naming collision at static/image/a.png: src/a/a.png, src/b/a.png"]
        );
    }

    #[test]
    fn test_summary() {
        let mut report = BuildReport::superseded();
        report.modules = 3;
        report.written = vec!["static/js/index.js".into()];
        report.errors.push(TransformError::new("src/bad.ts", StageName::SyntaxParse, "x"));
        assert_eq!(report.summary(), "3 modules, 1 file, 1 error");
        assert_eq!(report.errors[0].stage, FailedAt::Stage(StageName::SyntaxParse));
    }
}
