//! # docembed
//!
//! Token-bounded document chunking, embedding ingestion, and dot-product
//! similarity search.
//!
//! ## Overview
//!
//! This crate provides the pieces needed to turn a folder of text documents
//! into searchable embeddings:
//!
//! - [`TokenChunker`] splits documents into token-bounded [`Chunk`]s and folds
//!   undersized trailing chunks into their predecessor
//! - [`EmbeddingProvider`] turns text into vectors
//! - [`EntryStore`] persists [`StoredEntry`] records keyed by a unique title
//! - [`rank`] scores stored entries against a query vector and keeps the top K
//! - [`EmbedPipeline`] runs load → chunk → embed → store ingestion and
//!   embed → rank queries
//!
//! ## Features
//!
//! - `openai` — [`openai::OpenAiEmbeddingProvider`] via `reqwest`
//! - `pgvector` — [`pgvector::PgVectorStore`] via `sqlx`
//! - `hf-tokenizer` — [`HfTokenCounter`] via HuggingFace `tokenizers`
//! - `full` — all of the above
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docembed::*;
//!
//! let pipeline = EmbedPipeline::builder()
//!     .config(EmbedConfig::default())
//!     .embedding_provider(Arc::new(HashEmbeddingProvider::new(256)?))
//!     .store(Arc::new(InMemoryEntryStore::new()))
//!     .build()?;
//!
//! pipeline.setup().await?;
//! pipeline.ingest_source(&DirectorySource::new("./docs")).await?;
//! let results = pipeline.search("vector search").await?;
//! ```

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod inmemory;
pub mod jsonfile;
pub mod pipeline;
pub mod similarity;
pub mod source;
pub mod store;
pub mod tokenizer;

#[cfg(feature = "openai")]
pub mod openai;
#[cfg(feature = "pgvector")]
pub mod pgvector;

pub use chunking::{Chunker, DEFAULT_MAX_TOKENS, DEFAULT_MERGE_THRESHOLD, SplitPolicy, TokenChunker};
pub use config::{EmbedConfig, EmbedConfigBuilder};
pub use document::{Chunk, Document, QueryResult, StoredEntry};
pub use embedding::{EmbeddingProvider, HashEmbeddingProvider};
pub use error::{RagError, Result};
pub use inmemory::InMemoryEntryStore;
pub use jsonfile::JsonFileStore;
pub use pipeline::{EmbedPipeline, EmbedPipelineBuilder, IngestReport};
pub use similarity::{dot_product, normalize, rank};
pub use source::{DirectorySource, DocumentSource};
pub use store::EntryStore;
#[cfg(feature = "hf-tokenizer")]
pub use tokenizer::HfTokenCounter;
pub use tokenizer::{TokenCounter, WordTokenCounter};
