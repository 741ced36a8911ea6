//! Coordinator configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Coordinator configuration, loaded from TOML and `SILO_` env vars.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Path to the metadata database file.
    #[serde(default = "default_meta_path")]
    pub meta_path: PathBuf,
    /// Chunk size used when the client does not request one.
    #[serde(default = "default_chunk_size")]
    pub default_chunk_size: u64,
    /// Comma-separated list of chunk-node base URLs.
    #[serde(default = "default_storage_pool")]
    pub storage_pool: String,
    /// Copies written per chunk, including the primary.
    #[serde(default = "default_replicas")]
    pub replicas: usize,
    /// Coarse per-request deadline in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_meta_path() -> PathBuf {
    PathBuf::from("./data/meta.db")
}

fn default_chunk_size() -> u64 {
    crate::DEFAULT_CHUNK_SIZE
}

fn default_storage_pool() -> String {
    "http://storage1:9000,http://storage2:9000".to_string()
}

fn default_replicas() -> usize {
    2
}

fn default_request_timeout_secs() -> u64 {
    300
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            meta_path: default_meta_path(),
            default_chunk_size: default_chunk_size(),
            storage_pool: default_storage_pool(),
            replicas: default_replicas(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl CoordinatorConfig {
    /// Parse the storage pool into node URLs, trimming whitespace and
    /// dropping empty entries.
    pub fn nodes(&self) -> Vec<String> {
        self.storage_pool
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.trim_end_matches('/').to_string())
            .collect()
    }
}
