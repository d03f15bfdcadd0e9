//! Transform chains.
//!
//! ```text
//! classification ──► build_chain ──► [stage, stage, ..., emit] ──► ModuleOutput
//!                                        │
//!                                        └─ type-check ──► Checker (own thread)
//! ```
//!
//! Stage kinds are validated when the chain is built. Running a chain
//! never panics on bad input: every failure is a [`TransformError`] naming
//! the file and the stage.

pub mod chain;
mod check;
mod error;
mod link;
mod module;
mod resource;
mod run;
mod script;
mod stage;
mod style;
mod svg;

pub use chain::{Chain, ChainContext, build_chain};
pub use check::{Checker, TypeDiagnostic};
pub use error::{FailedAt, TransformError};
pub use module::{CssUrl, DepKind, DepRequest, ExtractedCss, ModuleOutput, ResourceUrl};
pub use resource::parse_data_uri;
pub use run::{AssetSource, CancelToken, RunError, TransformContext, run_chain};
pub use stage::{ArtifactKind, StageName};
pub use style::targets;
