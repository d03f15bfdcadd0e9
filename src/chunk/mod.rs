//! Chunking: group the finished module graph into deliverable files.
//!
//! Runs only after the graph is complete, so assignment sees every module
//! at once.
//!
//! ```text
//! policy.rs   cache groups from [[chunks]]
//! plan.rs     module -> chunk assignment, per-entry load lists
//! emit.rs     registry scripts and extracted CSS per chunk
//! ```

mod emit;
mod plan;
mod policy;

pub use emit::{ChunkFiles, emit_chunks};
pub use plan::{Chunk, ChunkPlan, ChunkingConflict, plan_chunks};
pub use policy::ChunkPolicy;
