//! Chunk node binary.

use anyhow::{Context, Result};
use clap::Parser;
use silo_node::{create_router, ChunkDir, NodeState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// silo chunk storage node
#[derive(Parser, Debug)]
#[command(name = "silo-node")]
#[command(version, about, long_about = None)]
struct Args {
    /// HTTP port to listen on
    #[arg(short, long, default_value_t = 9000)]
    port: u16,

    /// Directory to store chunks under (the node uses <data>/<id>)
    #[arg(short, long, default_value = "./data")]
    data: PathBuf,

    /// Node identifier
    #[arg(short, long, env = "NODE_ID")]
    id: String,
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

    let storage_dir = args.data.join(&args.id);
    let store = ChunkDir::open(&storage_dir)
        .await
        .with_context(|| format!("failed to open chunk directory {}", storage_dir.display()))?;
    tracing::info!(dir = %storage_dir.display(), "chunk directory ready");

    let state = NodeState {
        node_id: args.id.clone(),
        store: Arc::new(store),
    };
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;
    tracing::info!(node_id = %args.id, addr = %addr, "storage node listening");

    axum::serve(listener, app).await?;

    Ok(())
}
