//! Data types for documents, chunks, stored entries, and query results.

use serde::{Deserialize, Serialize};

/// A raw source document read from a [`DocumentSource`](crate::source::DocumentSource).
///
/// Documents are ephemeral: only the [`Chunk`]s derived from them are stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    /// The document title, usually its file name.
    pub title: String,
    /// The full text content.
    pub content: String,
}

impl Document {
    /// Create a document from a title and its text content.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self { title: title.into(), content: content.into() }
    }
}

/// A token-bounded segment of a [`Document`], the unit that gets embedded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    /// `{document title}-{index}`, unique within the parent document.
    pub title: String,
    /// The trimmed chunk text.
    pub content: String,
    /// Length of `content` in characters.
    pub content_length: usize,
    /// Token count of `content` under the chunker's tokenizer.
    pub content_tokens: usize,
}

/// A persisted chunk together with its embedding vector.
///
/// Entries are keyed by `title` and never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredEntry {
    /// Unique key, copied from [`Chunk::title`].
    pub title: String,
    /// The chunk text that was embedded.
    pub content: String,
    /// The embedding vector for `content`.
    pub vector: Vec<f32>,
}

impl StoredEntry {
    /// Pair a chunk with the embedding produced for it.
    pub fn from_chunk(chunk: &Chunk, vector: Vec<f32>) -> Self {
        Self { title: chunk.title.clone(), content: chunk.content.clone(), vector }
    }
}

/// A stored entry scored against a query vector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryResult {
    /// Title of the matching entry.
    pub title: String,
    /// Text of the matching entry.
    pub content: String,
    /// Unnormalized dot product between the query and entry vectors.
    pub similarity: f32,
}
