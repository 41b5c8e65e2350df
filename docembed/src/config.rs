//! Configuration for chunking, ingestion, and search.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::chunking::{DEFAULT_MAX_TOKENS, DEFAULT_MERGE_THRESHOLD, SplitPolicy};
use crate::error::{RagError, Result};

/// Default number of results returned by a search.
pub const DEFAULT_TOP_K: usize = 5;

/// Default minimum similarity; results at or below it are dropped.
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.01;

/// Configuration parameters for the [`EmbedPipeline`](crate::pipeline::EmbedPipeline).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbedConfig {
    /// Maximum tokens per chunk before the document is split.
    pub max_tokens: usize,
    /// Chunks with fewer tokens than this are folded into their predecessor.
    pub merge_threshold: usize,
    /// Where oversized documents are split.
    pub split: SplitPolicy,
    /// Number of top results to return from a search.
    pub top_k: usize,
    /// Results with similarity at or below this value are filtered out.
    pub similarity_threshold: f32,
    /// Upper bound on each embedding or store call. `None` waits forever.
    pub call_timeout: Option<Duration>,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            merge_threshold: DEFAULT_MERGE_THRESHOLD,
            split: SplitPolicy::default(),
            top_k: DEFAULT_TOP_K,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            call_timeout: None,
        }
    }
}

impl EmbedConfig {
    /// Create a new builder for constructing an [`EmbedConfig`].
    pub fn builder() -> EmbedConfigBuilder {
        EmbedConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`EmbedConfig`].
#[derive(Debug, Clone, Default)]
pub struct EmbedConfigBuilder {
    config: EmbedConfig,
}

impl EmbedConfigBuilder {
    /// Set the maximum tokens per chunk.
    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.config.max_tokens = max_tokens;
        self
    }

    /// Set the token count below which a chunk is merged backward.
    pub fn merge_threshold(mut self, threshold: usize) -> Self {
        self.config.merge_threshold = threshold;
        self
    }

    /// Set the split policy for oversized documents.
    pub fn split(mut self, split: SplitPolicy) -> Self {
        self.config.split = split;
        self
    }

    /// Set the number of top results to return from a search.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the similarity threshold for filtering results.
    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.config.similarity_threshold = threshold;
        self
    }

    /// Bound every external call by `timeout`.
    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.config.call_timeout = Some(timeout);
        self
    }

    /// Build the [`EmbedConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `max_tokens == 0`
    /// - `top_k == 0`
    /// - `similarity_threshold` is NaN or infinite
    /// - `call_timeout` is zero
    pub fn build(self) -> Result<EmbedConfig> {
        if self.config.max_tokens == 0 {
            return Err(RagError::ConfigError("max_tokens must be greater than zero".to_string()));
        }
        if self.config.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if !self.config.similarity_threshold.is_finite() {
            return Err(RagError::ConfigError(format!(
                "similarity_threshold must be finite, got {}",
                self.config.similarity_threshold
            )));
        }
        if self.config.call_timeout.is_some_and(|t| t.is_zero()) {
            return Err(RagError::ConfigError("call_timeout must be non-zero".to_string()));
        }
        Ok(self.config)
    }
}
