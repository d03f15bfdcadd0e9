//! Actor system for watch mode.
//!
//! ```text
//! FsActor ──► BuilderActor ──► WsActor
//! (watch)      (rebuild)      (broadcast)
//! ```
//!
//! - `messages` - message types between actors
//! - `fs` - file watcher with debouncing
//! - `builder` - serialized rebuilds over the shared [`Pipeline`](crate::pipeline::Pipeline)
//! - `ws` - live-reload WebSocket
//! - `coordinator` - wires up and runs the actors

pub mod builder;
pub mod coordinator;
pub mod fs;
pub mod messages;
pub mod ws;

pub use coordinator::Coordinator;
