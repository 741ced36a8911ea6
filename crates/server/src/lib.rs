//! Coordinator for the silo distributed object store.
//!
//! The coordinator accepts whole files over HTTP, cuts them into
//! content-addressed chunks, deduplicates against everything uploaded
//! before, fans each new chunk out to a replica set of storage nodes, and
//! reassembles files on demand from whichever replicas still answer.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
