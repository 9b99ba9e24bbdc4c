//! # DocuMind
//!
//! A document ingestion and semantic retrieval engine.
//!
//! DocuMind takes extracted document text (from PDFs or scanned uploads),
//! splits it into overlapping chunks, embeds each chunk into a vector space,
//! and stores the chunks in a persistent collection for cosine-distance
//! similarity search with provenance (filename, page number).
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌──────────────────┐   ┌───────────┐
//! │ Extracted │──▶│ Retrieval Engine │──▶│  SQLite    │
//! │   text    │   │ Clean+Chunk+Embed│   │ Collection │
//! └───────────┘   └────────┬─────────┘   └─────┬─────┘
//!                          │                   │
//!                          ▼                   ▼
//!                    ┌──────────┐        ┌──────────┐
//!                    │  ingest  │        │  search  │
//!                    └──────────┘        └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! documind init                     # create the collection
//! documind ingest order1.pdf        # extract, chunk, embed, store
//! documind search "what is the penalty" --limit 3
//! documind stats                    # collection overview
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Typed document, chunk, and result records |
//! | [`clean`] | Text normalization and page-marker extraction |
//! | [`chunk`] | Overlapping text chunking |
//! | [`embedding`] | Embedding provider abstraction + bounded cache |
//! | [`store`] | Persistent chunk collection with cosine query |
//! | [`engine`] | Ingest/search orchestration |
//! | [`themes`] | Keyword theme-grouping of results |
//! | [`extract`] | Text extraction for the CLI boundary |

pub mod chunk;
pub mod clean;
pub mod config;
pub mod embedding;
pub mod engine;
pub mod extract;
pub mod models;
pub mod store;
pub mod themes;
