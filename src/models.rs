//! Core data models for the ingestion and retrieval pipeline.
//!
//! Metadata is carried as explicit typed records rather than loose maps;
//! `extra` is the open extension point for caller-supplied tags, flattened
//! into the stored JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Caller-supplied metadata for one uploaded document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub document_id: String,
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_date: Option<DateTime<Utc>>,
    #[serde(default, flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl DocumentMeta {
    pub fn new(document_id: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            filename: filename.into(),
            upload_date: Some(Utc::now()),
            extra: serde_json::Map::new(),
        }
    }
}

/// Full metadata attached to one stored chunk: the owning document's fields
/// plus the chunk's own position and size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub document_id: String,
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_date: Option<DateTime<Utc>>,
    pub chunk_index: i64,
    pub text_length: i64,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default, flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_page() -> u32 {
    1
}

impl ChunkMetadata {
    pub fn for_chunk(meta: &DocumentMeta, chunk_index: i64, text_length: i64, page: u32) -> Self {
        Self {
            document_id: meta.document_id.clone(),
            filename: meta.filename.clone(),
            upload_date: meta.upload_date,
            chunk_index,
            text_length,
            page,
            extra: meta.extra.clone(),
        }
    }
}

/// A chunk ready for storage: text, vector, and metadata keyed by a
/// derived id of the form `{document_id}_chunk_{index}`.
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    pub id: String,
    pub document_id: String,
    pub chunk_index: i64,
    pub text: String,
    pub page: u32,
    pub embedding: Vec<f32>,
    pub metadata: ChunkMetadata,
}

/// A ranked candidate returned from the collection store, ascending by
/// cosine distance.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub chunk_id: String,
    pub document_id: String,
    pub text: String,
    pub page: u32,
    pub metadata: ChunkMetadata,
    pub distance: f64,
}

/// One search result surfaced to callers.
///
/// `relevance_score` is `1 − distance` rounded to 3 decimals; it is
/// advisory display-only, ranking uses the raw distance.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResultItem {
    pub text: String,
    pub metadata: ChunkMetadata,
    pub page: u32,
    pub distance: f64,
    pub relevance_score: f64,
}

/// Collection overview returned by `stats`.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionStats {
    pub total_documents: i64,
    pub total_chunks: i64,
    pub collection_name: String,
    pub embedding_model: String,
    pub dims: usize,
}

/// A theme grouping of search results by keyword.
#[derive(Debug, Clone, Serialize)]
pub struct Theme {
    pub name: String,
    pub description: String,
    pub citations: Vec<String>,
}
