//! Error types for the `docembed` crate.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while chunking, ingesting, or searching.
#[derive(Debug, Error)]
pub enum RagError {
    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the entry store backend.
    #[error("Store error ({backend}): {message}")]
    StoreError {
        /// The store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// An entry with this title already exists in the store.
    #[error("entry '{0}' already exists")]
    DuplicateEntry(String),

    /// A document could not be listed or extracted from its source.
    #[error("Source error ({}): {message}", path.display())]
    SourceError {
        /// The path that could not be read.
        path: PathBuf,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An error in the ingestion or search orchestration.
    #[error("Pipeline error: {0}")]
    PipelineError(String),

    /// An external call did not complete within the configured timeout.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The timeout that elapsed.
        after: Duration,
    },
}

impl RagError {
    pub(crate) fn store(backend: &str, message: impl Into<String>) -> Self {
        Self::StoreError { backend: backend.to_string(), message: message.into() }
    }
}

/// A convenience result type for `docembed` operations.
pub type Result<T> = std::result::Result<T, RagError>;
