//! Persistent chunk collection over SQLite.
//!
//! The [`CollectionStore`] keeps (vector, text, metadata) triples keyed by
//! chunk id and answers nearest-neighbor queries by brute-force cosine
//! distance computed in Rust. Vectors are stored as little-endian f32 BLOBs.
//!
//! A collection is bound to one embedding dimensionality. Opening a
//! collection whose stored dimensionality differs from the embedder's
//! current output destroys and recreates it empty — mixing dimensions would
//! silently corrupt every search, so the repair is destructive and visible.

use anyhow::{bail, Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;

use crate::embedding::{blob_to_vec, cosine_distance, vec_to_blob};
use crate::models::{Candidate, ChunkMetadata, ChunkRecord};

pub struct CollectionStore {
    pool: SqlitePool,
    name: String,
    dims: usize,
    upsert_batch_size: usize,
}

/// A stored entry returned by [`CollectionStore::peek`], for diagnostics.
#[derive(Debug, Clone)]
pub struct PeekEntry {
    pub chunk_id: String,
    pub document_id: String,
    pub text: String,
}

impl CollectionStore {
    /// Open or create a persistent collection at `path`.
    ///
    /// `dims` is the embedder's output dimensionality; a mismatch against
    /// the stored collection triggers destructive recreation.
    pub async fn open(
        path: &Path,
        name: &str,
        model: &str,
        dims: usize,
        upsert_batch_size: usize,
    ) -> Result<Self> {
        if dims == 0 {
            bail!("collection dimensionality must be > 0");
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self {
            pool,
            name: name.to_string(),
            dims,
            upsert_batch_size,
        };

        store.migrate().await?;
        store.ensure_dimensions(model).await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS collection_meta (
                name TEXT PRIMARY KEY,
                dims INTEGER NOT NULL,
                model TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                id TEXT PRIMARY KEY,
                document_id TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                text TEXT NOT NULL,
                page INTEGER NOT NULL DEFAULT 1,
                text_length INTEGER NOT NULL,
                metadata_json TEXT NOT NULL DEFAULT '{}',
                embedding BLOB NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_document_id ON chunks(document_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Register the collection's dimensionality, recreating the collection
    /// empty if the stored dimensionality does not match.
    async fn ensure_dimensions(&self, model: &str) -> Result<()> {
        let existing: Option<i64> =
            sqlx::query_scalar("SELECT dims FROM collection_meta WHERE name = ?")
                .bind(&self.name)
                .fetch_optional(&self.pool)
                .await?;

        match existing {
            None => {
                sqlx::query(
                    "INSERT INTO collection_meta (name, dims, model, created_at) VALUES (?, ?, ?, ?)",
                )
                .bind(&self.name)
                .bind(self.dims as i64)
                .bind(model)
                .bind(chrono::Utc::now().timestamp())
                .execute(&self.pool)
                .await?;
            }
            Some(stored) if stored != self.dims as i64 => {
                eprintln!(
                    "Warning: collection '{}' holds {}-dim vectors but model '{}' produces {}; \
                     recreating the collection empty",
                    self.name, stored, model, self.dims
                );
                sqlx::query("DROP TABLE chunks").execute(&self.pool).await?;
                self.migrate().await?;
                sqlx::query(
                    "UPDATE collection_meta SET dims = ?, model = ?, created_at = ? WHERE name = ?",
                )
                .bind(self.dims as i64)
                .bind(model)
                .bind(chrono::Utc::now().timestamp())
                .bind(&self.name)
                .execute(&self.pool)
                .await?;
            }
            Some(_) => {}
        }

        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Insert or overwrite entries by id, in bounded batches.
    ///
    /// A failed batch is logged and skipped; ingestion continues with the
    /// remaining batches. Returns the number of chunks actually stored —
    /// best-effort, not atomic per document.
    pub async fn upsert(&self, records: &[ChunkRecord]) -> usize {
        let mut stored = 0;
        for batch in records.chunks(self.upsert_batch_size) {
            match self.upsert_batch(batch).await {
                Ok(n) => stored += n,
                Err(e) => {
                    eprintln!(
                        "Warning: upsert batch failed, skipping {} chunks: {}",
                        batch.len(),
                        e
                    );
                }
            }
        }
        stored
    }

    async fn upsert_batch(&self, batch: &[ChunkRecord]) -> Result<usize> {
        for record in batch {
            if record.embedding.len() != self.dims {
                bail!(
                    "chunk {} has a {}-dim embedding, collection expects {}",
                    record.id,
                    record.embedding.len(),
                    self.dims
                );
            }
        }

        let mut tx = self.pool.begin().await?;
        for record in batch {
            let metadata_json = serde_json::to_string(&record.metadata)?;
            sqlx::query(
                r#"
                INSERT INTO chunks (id, document_id, chunk_index, text, page, text_length, metadata_json, embedding)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    document_id = excluded.document_id,
                    chunk_index = excluded.chunk_index,
                    text = excluded.text,
                    page = excluded.page,
                    text_length = excluded.text_length,
                    metadata_json = excluded.metadata_json,
                    embedding = excluded.embedding
                "#,
            )
            .bind(&record.id)
            .bind(&record.document_id)
            .bind(record.chunk_index)
            .bind(&record.text)
            .bind(record.page as i64)
            .bind(record.text.len() as i64)
            .bind(&metadata_json)
            .bind(vec_to_blob(&record.embedding))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(batch.len())
    }

    /// Delete all chunks belonging to `document_id`. Returns rows removed.
    pub async fn delete_document(&self, document_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM chunks WHERE document_id = ?")
            .bind(document_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Return up to `fetch_k` candidates ordered by ascending cosine
    /// distance to `vector` (closest first).
    pub async fn query(&self, vector: &[f32], fetch_k: usize) -> Result<Vec<Candidate>> {
        let rows = sqlx::query(
            "SELECT id, document_id, text, page, metadata_json, embedding FROM chunks",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut candidates = Vec::with_capacity(rows.len());
        for row in &rows {
            let chunk_id: String = row.get("id");
            let blob: Vec<u8> = row.get("embedding");
            let metadata_json: String = row.get("metadata_json");
            let metadata: ChunkMetadata = serde_json::from_str(&metadata_json)
                .with_context(|| format!("corrupt metadata for chunk {}", chunk_id))?;

            candidates.push(Candidate {
                chunk_id,
                document_id: row.get("document_id"),
                text: row.get("text"),
                page: row.get::<i64, _>("page") as u32,
                metadata,
                distance: cosine_distance(vector, &blob_to_vec(&blob)),
            });
        }

        candidates.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        candidates.truncate(fetch_k);

        Ok(candidates)
    }

    /// Total stored chunks.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Distinct documents with at least one stored chunk.
    pub async fn document_count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(DISTINCT document_id) FROM chunks")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Up to `n` arbitrary stored entries, for diagnostics only.
    pub async fn peek(&self, n: usize) -> Result<Vec<PeekEntry>> {
        let rows = sqlx::query("SELECT id, document_id, text FROM chunks LIMIT ?")
            .bind(n as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| PeekEntry {
                chunk_id: row.get("id"),
                document_id: row.get("document_id"),
                text: row.get("text"),
            })
            .collect())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChunkMetadata, DocumentMeta};
    use tempfile::TempDir;

    fn record(id: &str, doc: &str, index: i64, text: &str, embedding: Vec<f32>) -> ChunkRecord {
        let meta = DocumentMeta::new(doc, format!("{}.pdf", doc));
        ChunkRecord {
            id: id.to_string(),
            document_id: doc.to_string(),
            chunk_index: index,
            text: text.to_string(),
            page: 1,
            metadata: ChunkMetadata::for_chunk(&meta, index, text.len() as i64, 1),
            embedding,
        }
    }

    async fn open_store(dir: &TempDir, dims: usize) -> CollectionStore {
        CollectionStore::open(
            &dir.path().join("collection.sqlite"),
            "documents",
            "feature-hashing",
            dims,
            10,
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn upsert_and_count() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, 3).await;

        let records = vec![
            record("d1_chunk_0", "d1", 0, "first chunk text here", vec![1.0, 0.0, 0.0]),
            record("d1_chunk_1", "d1", 1, "second chunk text here", vec![0.0, 1.0, 0.0]),
        ];
        assert_eq!(store.upsert(&records).await, 2);
        assert_eq!(store.count().await.unwrap(), 2);
        assert_eq!(store.document_count().await.unwrap(), 1);
        store.close().await;
    }

    #[tokio::test]
    async fn upsert_overwrites_by_id() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, 3).await;

        store
            .upsert(&[record("d1_chunk_0", "d1", 0, "original", vec![1.0, 0.0, 0.0])])
            .await;
        store
            .upsert(&[record("d1_chunk_0", "d1", 0, "replacement", vec![0.0, 1.0, 0.0])])
            .await;

        assert_eq!(store.count().await.unwrap(), 1);
        let entries = store.peek(10).await.unwrap();
        assert_eq!(entries[0].text, "replacement");
        store.close().await;
    }

    #[tokio::test]
    async fn query_orders_by_ascending_distance() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, 3).await;

        store
            .upsert(&[
                record("d1_chunk_0", "d1", 0, "exact match vector", vec![1.0, 0.0, 0.0]),
                record("d1_chunk_1", "d1", 1, "orthogonal vector one", vec![0.0, 1.0, 0.0]),
                record("d2_chunk_0", "d2", 0, "nearby diagonal vector", vec![1.0, 1.0, 0.0]),
            ])
            .await;

        let candidates = store.query(&[1.0, 0.0, 0.0], 10).await.unwrap();
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].chunk_id, "d1_chunk_0");
        assert!(candidates[0].distance < 1e-6);
        assert_eq!(candidates[1].chunk_id, "d2_chunk_0");
        assert!(candidates[1].distance < candidates[2].distance);
        store.close().await;
    }

    #[tokio::test]
    async fn query_truncates_to_fetch_k() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, 3).await;

        let records: Vec<ChunkRecord> = (0..7)
            .map(|i| {
                record(
                    &format!("d1_chunk_{}", i),
                    "d1",
                    i,
                    &format!("chunk number {} text", i),
                    vec![1.0, i as f32, 0.0],
                )
            })
            .collect();
        store.upsert(&records).await;

        let candidates = store.query(&[1.0, 0.0, 0.0], 4).await.unwrap();
        assert_eq!(candidates.len(), 4);
        store.close().await;
    }

    #[tokio::test]
    async fn wrong_dimension_batch_is_skipped_not_fatal() {
        let dir = TempDir::new().unwrap();
        let store = CollectionStore::open(
            &dir.path().join("collection.sqlite"),
            "documents",
            "feature-hashing",
            3,
            2, // two records per batch
        )
        .await
        .unwrap();

        let records = vec![
            record("d1_chunk_0", "d1", 0, "good batch entry one", vec![1.0, 0.0, 0.0]),
            record("d1_chunk_1", "d1", 1, "good batch entry two", vec![0.0, 1.0, 0.0]),
            record("d1_chunk_2", "d1", 2, "bad dimensionality here", vec![1.0, 0.0]),
            record("d1_chunk_3", "d1", 3, "dragged down with it", vec![0.0, 0.0, 1.0]),
        ];

        // Second batch (chunks 2+3) fails validation and is skipped.
        assert_eq!(store.upsert(&records).await, 2);
        assert_eq!(store.count().await.unwrap(), 2);
        store.close().await;
    }

    #[tokio::test]
    async fn delete_document_removes_only_that_document() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, 3).await;

        store
            .upsert(&[
                record("d1_chunk_0", "d1", 0, "first document chunk", vec![1.0, 0.0, 0.0]),
                record("d2_chunk_0", "d2", 0, "second document chunk", vec![0.0, 1.0, 0.0]),
            ])
            .await;

        assert_eq!(store.delete_document("d1").await.unwrap(), 1);
        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.document_count().await.unwrap(), 1);
        store.close().await;
    }

    #[tokio::test]
    async fn dimension_mismatch_recreates_collection() {
        let dir = TempDir::new().unwrap();

        let store = open_store(&dir, 3).await;
        store
            .upsert(&[record("d1_chunk_0", "d1", 0, "soon to be destroyed", vec![1.0, 0.0, 0.0])])
            .await;
        assert_eq!(store.count().await.unwrap(), 1);
        store.close().await;

        // Reopen with a different dimensionality: destructive repair.
        let store = open_store(&dir, 5).await;
        assert_eq!(store.count().await.unwrap(), 0);
        assert_eq!(store.dims(), 5);
        store.close().await;
    }

    #[tokio::test]
    async fn reopen_with_same_dims_keeps_data() {
        let dir = TempDir::new().unwrap();

        let store = open_store(&dir, 3).await;
        store
            .upsert(&[record("d1_chunk_0", "d1", 0, "durable chunk text", vec![1.0, 0.0, 0.0])])
            .await;
        store.close().await;

        let store = open_store(&dir, 3).await;
        assert_eq!(store.count().await.unwrap(), 1);
        store.close().await;
    }
}
