//! Application state shared across handlers.

use silo_core::config::CoordinatorConfig;
use silo_metadata::MetaStore;
use silo_transport::ChunkTransport;
use std::sync::Arc;

/// Shared coordinator state.
///
/// The metadata store and the chunk transport are injected as
/// capabilities so tests can substitute in-memory fakes.
#[derive(Clone)]
pub struct AppState {
    /// Coordinator configuration.
    pub config: Arc<CoordinatorConfig>,
    /// Metadata store.
    pub store: Arc<dyn MetaStore>,
    /// Transport to chunk nodes.
    pub transport: Arc<dyn ChunkTransport>,
    /// Static pool of chunk-node base URLs.
    pub pool: Arc<Vec<String>>,
}

impl AppState {
    /// Create the coordinator state, parsing the node pool out of the
    /// configuration.
    pub fn new(
        config: CoordinatorConfig,
        store: Arc<dyn MetaStore>,
        transport: Arc<dyn ChunkTransport>,
    ) -> Self {
        let pool = Arc::new(config.nodes());
        if pool.is_empty() {
            tracing::warn!("storage pool is empty, uploads will fail");
        }
        Self {
            config: Arc::new(config),
            store,
            transport,
            pool,
        }
    }
}
