//! Output naming, hashing and collision checks.

mod conflict;
mod hash;
mod namer;

pub use conflict::{NamingCollision, dedupe, print_collisions};
pub use hash::ContentHash;
pub use namer::{OutputArtifact, name};
