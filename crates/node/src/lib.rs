//! Chunk storage node.
//!
//! A node owns one directory of immutable, content-addressed chunk files.
//! Every file's name is the SHA-256 of its bytes; the Put path enforces
//! that invariant before a chunk becomes visible.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod store;

pub use error::NodeError;
pub use handlers::NodeState;
pub use routes::create_router;
pub use store::{ChunkDir, DirStats, PutOutcome};
