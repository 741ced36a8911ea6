//! Route configuration.

use crate::handlers;
use crate::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Create the coordinator router.
pub fn create_router(state: AppState) -> Router {
    let deadline = Duration::from_secs(state.config.request_timeout_secs);

    Router::new()
        .route("/upload", post(handlers::upload))
        .route("/download", get(handlers::download))
        .route("/info", get(handlers::info))
        // Uploads are arbitrarily large; chunking bounds memory use.
        .layer(DefaultBodyLimit::disable())
        .layer(TimeoutLayer::new(deadline))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
