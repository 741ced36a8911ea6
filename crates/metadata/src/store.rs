//! Metadata store trait and SQLite implementation.

use crate::error::{MetadataError, MetadataResult};
use async_trait::async_trait;
use silo_core::chunk::ChunkInfo;
use silo_core::hash::ChunkId;
use silo_core::manifest::FileManifest;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

/// Persistent store for file manifests and the chunk dedup index.
///
/// Every mutating operation is a single transaction; concurrent writers
/// are serialized by the store. Implementations must tolerate a dedup
/// entry whose node has since lost the chunk; the record is advisory.
#[async_trait]
pub trait MetaStore: Send + Sync {
    /// Create a fresh, incomplete manifest for a new upload.
    async fn init_file(&self, file_id: Uuid, filename: &str, size: u64) -> MetadataResult<()>;

    /// Record a replica of chunk `index` for the file. Appends to the
    /// replica list unless the node is already recorded for that index.
    async fn save_chunk(&self, file_id: Uuid, index: u32, info: ChunkInfo) -> MetadataResult<()>;

    /// Insert or overwrite the dedup entry for a chunk hash.
    async fn save_chunk_hash(&self, chunk_id: &ChunkId, info: ChunkInfo) -> MetadataResult<()>;

    /// Look up the dedup entry for a chunk hash.
    async fn has_chunk_by_hash(&self, chunk_id: &ChunkId) -> MetadataResult<Option<ChunkInfo>>;

    /// Fetch the full manifest for a file.
    async fn get_file_meta(&self, file_id: Uuid) -> MetadataResult<FileManifest>;

    /// Freeze the manifest: no further mutation after this. Refuses a
    /// manifest with any unpopulated index, so a frozen file is always
    /// reassemblable from its recorded replicas.
    async fn mark_complete(&self, file_id: Uuid) -> MetadataResult<()>;

    /// Flush and release the backing file.
    async fn close(&self);
}

/// SQLite-backed metadata store.
///
/// Manifests are stored as JSON documents and mutated load-modify-store
/// inside a transaction, which keeps every operation all-or-nothing
/// without a relational decomposition of the replica lists.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open (or create) the store at the given path.
    pub async fn new(path: impl AsRef<Path>) -> MetadataResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        // A single connection serializes writers, which sidesteps SQLite's
        // "database is locked" failures under concurrent uploads.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> MetadataResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS files (
                file_id  TEXT PRIMARY KEY,
                manifest TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                chunk_hash TEXT PRIMARY KEY,
                node_url   TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load_manifest(
        tx: &mut sqlx::Transaction<'_, Sqlite>,
        file_id: Uuid,
    ) -> MetadataResult<FileManifest> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT manifest FROM files WHERE file_id = ?")
                .bind(file_id.to_string())
                .fetch_optional(&mut **tx)
                .await?;
        let (raw,) = row.ok_or_else(|| MetadataError::NotFound(format!("file {file_id}")))?;
        Ok(serde_json::from_str(&raw)?)
    }

    async fn store_manifest(
        tx: &mut sqlx::Transaction<'_, Sqlite>,
        manifest: &FileManifest,
    ) -> MetadataResult<()> {
        sqlx::query("UPDATE files SET manifest = ? WHERE file_id = ?")
            .bind(serde_json::to_string(manifest)?)
            .bind(manifest.file_id.to_string())
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl MetaStore for SqliteStore {
    async fn init_file(&self, file_id: Uuid, filename: &str, _size: u64) -> MetadataResult<()> {
        let manifest = FileManifest::new(file_id, filename);
        sqlx::query("INSERT OR REPLACE INTO files (file_id, manifest) VALUES (?, ?)")
            .bind(file_id.to_string())
            .bind(serde_json::to_string(&manifest)?)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn save_chunk(&self, file_id: Uuid, index: u32, info: ChunkInfo) -> MetadataResult<()> {
        let mut tx = self.pool.begin().await?;
        let mut manifest = Self::load_manifest(&mut tx, file_id).await?;
        manifest.record_replica(index, info);
        Self::store_manifest(&mut tx, &manifest).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn save_chunk_hash(&self, chunk_id: &ChunkId, info: ChunkInfo) -> MetadataResult<()> {
        sqlx::query(
            r#"
            INSERT INTO chunks (chunk_hash, node_url) VALUES (?, ?)
            ON CONFLICT(chunk_hash) DO UPDATE SET node_url = excluded.node_url
            "#,
        )
        .bind(chunk_id.to_hex())
        .bind(&info.node_url)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn has_chunk_by_hash(&self, chunk_id: &ChunkId) -> MetadataResult<Option<ChunkInfo>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT node_url FROM chunks WHERE chunk_hash = ?")
                .bind(chunk_id.to_hex())
                .fetch_optional(&self.pool)
                .await?;
        // The info is rebuilt from the lookup key, so the returned id can
        // never disagree with the hash that was asked about.
        Ok(row.map(|(node_url,)| ChunkInfo::new(*chunk_id, node_url)))
    }

    async fn get_file_meta(&self, file_id: Uuid) -> MetadataResult<FileManifest> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT manifest FROM files WHERE file_id = ?")
                .bind(file_id.to_string())
                .fetch_optional(&self.pool)
                .await?;
        let (raw,) = row.ok_or_else(|| MetadataError::NotFound(format!("file {file_id}")))?;
        Ok(serde_json::from_str(&raw)?)
    }

    async fn mark_complete(&self, file_id: Uuid) -> MetadataResult<()> {
        let mut tx = self.pool.begin().await?;
        let mut manifest = Self::load_manifest(&mut tx, file_id).await?;
        if !manifest.is_fully_populated() {
            let missing = (0..manifest.total_chunks)
                .filter(|&i| manifest.replicas(i).is_empty())
                .count();
            return Err(MetadataError::MissingChunks { missing });
        }
        manifest.complete = true;
        Self::store_manifest(&mut tx, &manifest).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
