//! Coordinator binary.

use anyhow::{Context, Result};
use clap::Parser;
use figment::providers::{Env, Format, Toml};
use figment::Figment;
use silo_core::config::CoordinatorConfig;
use silo_metadata::{MetaStore, SqliteStore};
use silo_server::{create_router, AppState};
use silo_transport::{ChunkTransport, HttpTransport};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// silo - a small distributed object store
#[derive(Parser, Debug)]
#[command(name = "silod")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "SILO_CONFIG",
        default_value = "config/coordinator.toml"
    )]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("silod v{}", env!("CARGO_PKG_VERSION"));

    // The config file is optional; env vars can provide everything.
    let mut figment = Figment::new();
    let config_path = std::path::Path::new(&args.config);
    if config_path.exists() {
        tracing::info!(config_path = %args.config, "loading configuration from file");
        figment = figment.merge(Toml::file(&args.config));
    } else {
        tracing::debug!("no config file found at {}", args.config);
    }

    let config: CoordinatorConfig = figment
        .merge(Env::prefixed("SILO_"))
        .extract()
        .context("failed to load configuration")?;

    let store: Arc<dyn MetaStore> = Arc::new(
        SqliteStore::new(&config.meta_path)
            .await
            .with_context(|| format!("failed to open metastore {}", config.meta_path.display()))?,
    );
    tracing::info!(path = %config.meta_path.display(), "metadata store initialized");

    let transport: Arc<dyn ChunkTransport> = Arc::new(HttpTransport::new());

    let addr: SocketAddr = config.bind.parse().context("invalid bind address")?;
    let state = AppState::new(config, store, transport);
    tracing::info!(nodes = state.pool.len(), "connected to storage pool");

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;
    tracing::info!("listening on {addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
