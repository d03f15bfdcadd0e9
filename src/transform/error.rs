use std::fmt;

use serde::Serialize;
use thiserror::Error;

use super::stage::StageName;

/// Where in the pipeline a file failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailedAt {
    Read,
    Resolve,
    /// The chain for this file could not be assembled.
    Chain,
    Stage(StageName),
}

impl fmt::Display for FailedAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => f.write_str("read"),
            Self::Resolve => f.write_str("resolve"),
            Self::Chain => f.write_str("chain"),
            Self::Stage(stage) => stage.fmt(f),
        }
    }
}

/// A file that could not be turned into a module.
///
/// Collected per build, never raised past the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{path}: {stage}: {message}")]
pub struct TransformError {
    /// Module id of the failing file.
    pub path: String,
    pub stage: FailedAt,
    pub message: String,
}

impl TransformError {
    pub fn new(path: impl Into<String>, stage: StageName, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            stage: FailedAt::Stage(stage),
            message: message.into(),
        }
    }

    pub fn read(path: impl Into<String>, err: &std::io::Error) -> Self {
        Self {
            path: path.into(),
            stage: FailedAt::Read,
            message: err.to_string(),
        }
    }

    pub fn resolve(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            stage: FailedAt::Resolve,
            message: message.into(),
        }
    }
}
