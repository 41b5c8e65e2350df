//! Ingestion and search orchestrator.
//!
//! The [`EmbedPipeline`] coordinates the load → chunk → embed → store
//! workflow and the embed → rank query path by composing an
//! [`EmbeddingProvider`], an [`EntryStore`], and a [`Chunker`].
//!
//! Everything runs sequentially: one document at a time, one chunk at a
//! time, each external call awaited before the next starts. The first
//! failing call aborts the run; nothing is retried.
//!
//! # Example
//!
//! ```rust,ignore
//! use docembed::{EmbedPipeline, EmbedConfig, InMemoryEntryStore, TokenChunker, DirectorySource};
//!
//! let config = EmbedConfig::default();
//! let pipeline = EmbedPipeline::builder()
//!     .chunker(Arc::new(TokenChunker::from_config(&config)))
//!     .config(config)
//!     .embedding_provider(Arc::new(my_embedder))
//!     .store(Arc::new(InMemoryEntryStore::new()))
//!     .build()?;
//!
//! pipeline.setup().await?;
//! pipeline.ingest_source(&DirectorySource::new("./docs")).await?;
//! let results = pipeline.search("how do I reset my password?").await?;
//! ```

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::chunking::Chunker;
use crate::config::EmbedConfig;
use crate::document::{Chunk, Document, QueryResult, StoredEntry};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::similarity::rank;
use crate::source::DocumentSource;
use crate::store::EntryStore;

/// Counts produced by an ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    /// Documents processed.
    pub documents: usize,
    /// Chunks produced by the chunker.
    pub chunks: usize,
    /// Chunks embedded and written to the store.
    pub created: usize,
    /// Chunks skipped because an entry with the same title already existed.
    pub skipped: usize,
}

impl IngestReport {
    fn absorb(&mut self, other: Self) {
        self.documents += other.documents;
        self.chunks += other.chunks;
        self.created += other.created;
        self.skipped += other.skipped;
    }
}

/// The ingestion and search orchestrator.
///
/// Construct one via [`EmbedPipeline::builder()`].
pub struct EmbedPipeline {
    config: EmbedConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn EntryStore>,
    chunker: Arc<dyn Chunker>,
}

impl EmbedPipeline {
    /// Create a new [`EmbedPipelineBuilder`].
    pub fn builder() -> EmbedPipelineBuilder {
        EmbedPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &EmbedConfig {
        &self.config
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// Return a reference to the entry store.
    pub fn store(&self) -> &Arc<dyn EntryStore> {
        &self.store
    }

    /// Run `call` under the configured timeout, if any.
    async fn bounded<T>(
        &self,
        operation: &str,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match self.config.call_timeout {
            Some(after) => tokio::time::timeout(after, call)
                .await
                .map_err(|_| RagError::Timeout { operation: operation.to_string(), after })?,
            None => call.await,
        }
    }

    /// Prepare the store for entries of the provider's dimensionality.
    ///
    /// Idempotent; call it once before the first ingestion.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] if the store cannot be prepared.
    pub async fn setup(&self) -> Result<()> {
        let dimensions = self.embedding_provider.dimensions();
        self.bounded("store setup", self.store.ensure_ready(dimensions)).await.map_err(|e| {
            error!(dimensions, error = %e, "failed to prepare store");
            RagError::PipelineError(format!("failed to prepare store: {e}"))
        })?;
        info!(dimensions, "store ready");
        Ok(())
    }

    /// Split documents into chunks without embedding or storing them.
    pub fn chunk_documents(&self, documents: &[Document]) -> Vec<Vec<Chunk>> {
        documents.iter().map(|document| self.chunker.chunk(document)).collect()
    }

    /// Store one chunk unless an entry with its title already exists.
    ///
    /// Returns `true` if a new entry was created.
    async fn ingest_chunk(&self, chunk: &Chunk) -> Result<bool> {
        let existing =
            self.bounded("store lookup", self.store.find_by_title(&chunk.title)).await?;
        if existing.is_some() {
            debug!(chunk.title = %chunk.title, "entry exists, skipping");
            return Ok(false);
        }

        let vector =
            self.bounded("embedding", self.embedding_provider.embed(&chunk.content)).await?;
        let entry = StoredEntry::from_chunk(chunk, vector);

        match self.bounded("store create", self.store.create(entry)).await {
            Ok(()) => {
                debug!(
                    chunk.title = %chunk.title,
                    chunk.tokens = chunk.content_tokens,
                    "stored entry"
                );
                Ok(true)
            }
            // Another run stored the same title after our lookup.
            Err(RagError::DuplicateEntry(_)) => {
                debug!(chunk.title = %chunk.title, "entry created concurrently, skipping");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Ingest a single document: chunk → (skip if stored | embed → store).
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] on the first chunk whose lookup,
    /// embedding, or storage fails, naming the document and chunk.
    pub async fn ingest(&self, document: &Document) -> Result<IngestReport> {
        let chunks = self.chunker.chunk(document);
        let mut report = IngestReport { documents: 1, chunks: chunks.len(), ..Default::default() };

        for chunk in &chunks {
            let created = self.ingest_chunk(chunk).await.map_err(|e| {
                error!(
                    document.title = %document.title,
                    chunk.title = %chunk.title,
                    error = %e,
                    "ingestion failed"
                );
                RagError::PipelineError(format!(
                    "ingestion failed for '{}' at chunk '{}': {e}",
                    document.title, chunk.title
                ))
            })?;
            if created {
                report.created += 1;
            } else {
                report.skipped += 1;
            }
        }

        info!(
            document.title = %document.title,
            chunk_count = report.chunks,
            created = report.created,
            skipped = report.skipped,
            "ingested document"
        );
        Ok(report)
    }

    /// Ingest multiple documents in order.
    ///
    /// # Errors
    ///
    /// Returns the error of the first document that fails; documents after
    /// it are not processed.
    pub async fn ingest_batch(&self, documents: &[Document]) -> Result<IngestReport> {
        let mut report = IngestReport::default();
        for document in documents {
            report.absorb(self.ingest(document).await?);
        }
        Ok(report)
    }

    /// Load documents from `source` and ingest them.
    ///
    /// # Errors
    ///
    /// Returns the source's error if listing fails, otherwise as
    /// [`ingest_batch`](Self::ingest_batch).
    pub async fn ingest_source(&self, source: &dyn DocumentSource) -> Result<IngestReport> {
        let documents = source.list_documents()?;
        let report = self.ingest_batch(&documents).await?;
        info!(
            documents = report.documents,
            created = report.created,
            skipped = report.skipped,
            "ingestion complete"
        );
        Ok(report)
    }

    /// Search with the configured threshold and `top_k`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] if embedding or listing fails.
    pub async fn search(&self, query: &str) -> Result<Vec<QueryResult>> {
        self.search_with(query, self.config.similarity_threshold, self.config.top_k).await
    }

    /// Embed `query`, score it against every stored entry, and return the
    /// best `top_k` results with similarity above `threshold`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] if embedding or listing fails.
    pub async fn search_with(
        &self,
        query: &str,
        threshold: f32,
        top_k: usize,
    ) -> Result<Vec<QueryResult>> {
        let query_vector =
            self.bounded("embedding", self.embedding_provider.embed(query)).await.map_err(|e| {
                error!(error = %e, "embedding failed during search");
                RagError::PipelineError(format!("query embedding failed: {e}"))
            })?;

        let corpus = self.bounded("store listing", self.store.list_all()).await.map_err(|e| {
            error!(error = %e, "listing entries failed during search");
            RagError::PipelineError(format!("listing entries failed: {e}"))
        })?;

        let results = rank(&query_vector, &corpus, threshold, top_k);
        info!(corpus_size = corpus.len(), result_count = results.len(), "search completed");
        Ok(results)
    }
}

/// Builder for constructing an [`EmbedPipeline`].
///
/// `embedding_provider` and `store` are required. `config` defaults to
/// [`EmbedConfig::default()`], and `chunker` defaults to a
/// [`TokenChunker`](crate::chunking::TokenChunker) built from the config.
#[derive(Default)]
pub struct EmbedPipelineBuilder {
    config: Option<EmbedConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    store: Option<Arc<dyn EntryStore>>,
    chunker: Option<Arc<dyn Chunker>>,
}

impl EmbedPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: EmbedConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the entry store backend.
    pub fn store(mut self, store: Arc<dyn EntryStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Build the [`EmbedPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if any required field is missing.
    pub fn build(self) -> Result<EmbedPipeline> {
        let config = self.config.unwrap_or_default();
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let store =
            self.store.ok_or_else(|| RagError::ConfigError("store is required".to_string()))?;
        let chunker = self.chunker.unwrap_or_else(|| {
            Arc::new(crate::chunking::TokenChunker::from_config(&config)) as Arc<dyn Chunker>
        });

        Ok(EmbedPipeline { config, embedding_provider, store, chunker })
    }
}
