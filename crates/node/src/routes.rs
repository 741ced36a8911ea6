//! Node route configuration.

use crate::handlers;
use crate::handlers::NodeState;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, put};
use axum::Router;
use tower_http::trace::TraceLayer;

/// Create the node router.
pub fn create_router(state: NodeState) -> Router {
    Router::new()
        .route(
            "/chunks/{chunk_id}",
            put(handlers::put_chunk)
                .get(handlers::get_chunk)
                .delete(handlers::delete_chunk),
        )
        .route("/status", get(handlers::status))
        // Chunk bodies can be as large as the coordinator's chunk size.
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
