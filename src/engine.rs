//! Retrieval engine: the ingest and search pipelines.
//!
//! Ingest: clean → chunk → embed → upsert. Search: clean → embed → query →
//! dedup → diversity cap → distance cutoff. Both paths share one cleaner and
//! one embedder so stored vectors and query vectors live in the same space.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

use crate::chunk::Chunker;
use crate::clean::{clean_text, page_of};
use crate::config::{Config, RetrievalConfig};
use crate::embedding::Embedder;
use crate::models::{ChunkMetadata, ChunkRecord, CollectionStats, DocumentMeta, SearchResultItem};
use crate::store::{CollectionStore, PeekEntry};

pub struct RetrievalEngine {
    store: CollectionStore,
    embedder: Embedder,
    chunker: Chunker,
    min_chars: usize,
    retrieval: RetrievalConfig,
}

impl RetrievalEngine {
    /// Open the engine against the configured collection, creating it on
    /// first use. Fails fast on provider misconfiguration.
    pub async fn open(config: &Config) -> Result<Self> {
        let embedder = Embedder::new(&config.embedding)?;

        let store = CollectionStore::open(
            &config.storage.path,
            &config.storage.collection,
            embedder.model_name(),
            embedder.dims(),
            config.storage.upsert_batch_size,
        )
        .await
        .with_context(|| {
            format!(
                "Failed to open collection at {}",
                config.storage.path.display()
            )
        })?;

        Ok(Self {
            store,
            embedder,
            chunker: Chunker::new(config.chunking.max_chars, config.chunking.overlap_chars),
            min_chars: config.chunking.min_chars,
            retrieval: config.retrieval.clone(),
        })
    }

    /// Ingest one document: clean, chunk, embed, and store its text under
    /// `meta.document_id`. Returns the number of chunks stored.
    ///
    /// Re-ingesting a document id replaces its previous chunks entirely, so
    /// a shrinking document cannot leave stale chunks behind. Text shorter
    /// than the configured minimum is ignored and yields zero chunks.
    pub async fn ingest(&self, raw_text: &str, meta: &DocumentMeta) -> Result<usize> {
        if raw_text.trim().len() < self.min_chars {
            return Ok(0);
        }

        let cleaned = clean_text(raw_text);
        if cleaned.is_empty() {
            return Ok(0);
        }

        let chunks: Vec<String> = self
            .chunker
            .split(&cleaned)
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| c.len() >= self.min_chars)
            .collect();

        if chunks.is_empty() {
            return Ok(0);
        }

        let embeddings = self
            .embedder
            .embed(&chunks)
            .await
            .with_context(|| format!("Failed to embed document '{}'", meta.document_id))?;

        let records: Vec<ChunkRecord> = chunks
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(i, (text, embedding))| {
                let index = i as i64;
                let page = page_of(&text);
                ChunkRecord {
                    id: format!("{}_chunk_{}", meta.document_id, index),
                    document_id: meta.document_id.clone(),
                    chunk_index: index,
                    page,
                    metadata: ChunkMetadata::for_chunk(meta, index, text.len() as i64, page),
                    embedding,
                    text,
                }
            })
            .collect();

        // Replace, not append: drop whatever this document id stored before.
        self.store.delete_document(&meta.document_id).await?;

        Ok(self.store.upsert(&records).await)
    }

    /// Search the collection, returning up to `n_results` ranked results.
    ///
    /// Candidates arrive ordered by ascending cosine distance and pass
    /// through three filters in order: exact-text dedup (content hash),
    /// per-document diversity cap, and the distance cutoff. An empty or
    /// fully-stripped query returns no results rather than erroring.
    pub async fn search(&self, query: &str, n_results: usize) -> Result<Vec<SearchResultItem>> {
        let cleaned = clean_text(query);
        if cleaned.is_empty() || n_results == 0 {
            return Ok(Vec::new());
        }

        let query_vector = self
            .embedder
            .embed_one(&cleaned)
            .await
            .context("Failed to embed query")?;

        let fetch_k = n_results.saturating_mul(self.retrieval.candidate_multiplier);
        let candidates = self.store.query(&query_vector, fetch_k).await?;

        let mut results = Vec::with_capacity(n_results);
        let mut seen_hashes = std::collections::HashSet::new();
        let mut per_document = std::collections::HashMap::<String, usize>::new();

        for candidate in candidates {
            if results.len() >= n_results {
                break;
            }
            // Dedup is against accepted results only: a copy skipped by the
            // per-document cap must not shadow the same text elsewhere.
            let hash = hash_text(&candidate.text);
            if seen_hashes.contains(&hash) {
                continue;
            }
            let doc_count = per_document.entry(candidate.document_id.clone()).or_insert(0);
            if *doc_count >= self.retrieval.max_per_document {
                continue;
            }
            if candidate.distance > self.retrieval.max_distance {
                // Candidates are sorted; everything after is farther still.
                break;
            }
            seen_hashes.insert(hash);
            *doc_count += 1;
            results.push(SearchResultItem {
                text: candidate.text,
                page: candidate.page,
                distance: candidate.distance,
                relevance_score: round3(1.0 - candidate.distance),
                metadata: candidate.metadata,
            });
        }

        Ok(results)
    }

    /// Collection overview: totals plus the embedding identity in use.
    pub async fn stats(&self) -> Result<CollectionStats> {
        Ok(CollectionStats {
            total_documents: self.store.document_count().await?,
            total_chunks: self.store.count().await?,
            collection_name: self.store.name().to_string(),
            embedding_model: self.embedder.model_name().to_string(),
            dims: self.store.dims(),
        })
    }

    /// A few stored entries, for inspection from the CLI.
    pub async fn peek(&self, n: usize) -> Result<Vec<PeekEntry>> {
        self.store.peek(n).await
    }

    pub async fn close(&self) {
        self.store.close().await;
    }
}

fn hash_text(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    format!("{:x}", digest)
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
