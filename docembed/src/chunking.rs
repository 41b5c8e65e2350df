//! Token-bounded document chunking.
//!
//! This module provides the [`Chunker`] trait and [`TokenChunker`], which
//! splits a document into segments of at most `max_tokens` tokens and then
//! folds undersized trailing segments back into their predecessor.
//!
//! Chunking proceeds in three passes:
//!
//! 1. If the whole document fits in `max_tokens`, it becomes one chunk.
//! 2. Otherwise the text is split according to the [`SplitPolicy`] and the
//!    segments are greedily packed into a buffer, flushing whenever the next
//!    segment would push the buffer over `max_tokens`.
//! 3. Any chunk after the first with fewer than `merge_threshold` tokens is
//!    appended to the chunk before it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EmbedConfig;
use crate::document::{Chunk, Document};
use crate::tokenizer::{TokenCounter, WordTokenCounter};

/// Default maximum tokens per chunk.
pub const DEFAULT_MAX_TOKENS: usize = 200;

/// Default token count below which a chunk is merged into its predecessor.
pub const DEFAULT_MERGE_THRESHOLD: usize = 100;

/// Where an oversized document is split into segments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitPolicy {
    /// Split on `\n`. Suits text with one idea per line or paragraph.
    #[default]
    Newline,
    /// Split after `". "`, keeping the period with its sentence.
    Sentence,
}

impl SplitPolicy {
    fn segments(self, text: &str) -> Vec<&str> {
        match self {
            Self::Newline => text.split('\n').collect(),
            Self::Sentence => split_keeping_separator(text, ". "),
        }
    }
}

/// A strategy for splitting documents into chunks.
///
/// Implementations produce [`Chunk`]s with text and token counts but no
/// embeddings; those are attached when the chunk is stored.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Always returns at least one chunk; an empty document yields one
    /// empty chunk.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Splits documents into chunks bounded by a token count.
///
/// Chunk titles are `{document title}-{index}`, where the index is the
/// chunk's position before merging. After a merge the surviving titles keep
/// their original index, so titles stay stable and unique per document.
///
/// # Example
///
/// ```rust,ignore
/// use docembed::{Document, TokenChunker, Chunker};
///
/// let chunker = TokenChunker::new(200);
/// let chunks = chunker.chunk(&Document::new("notes.txt", text));
/// ```
#[derive(Clone)]
pub struct TokenChunker {
    max_tokens: usize,
    merge_threshold: usize,
    split: SplitPolicy,
    counter: Arc<dyn TokenCounter>,
}

impl std::fmt::Debug for TokenChunker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenChunker")
            .field("max_tokens", &self.max_tokens)
            .field("merge_threshold", &self.merge_threshold)
            .field("split", &self.split)
            .finish_non_exhaustive()
    }
}

impl Default for TokenChunker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TOKENS)
    }
}

impl TokenChunker {
    /// Create a chunker with the given token limit, newline splitting, the
    /// default merge threshold, and a [`WordTokenCounter`].
    pub fn new(max_tokens: usize) -> Self {
        Self {
            max_tokens,
            merge_threshold: DEFAULT_MERGE_THRESHOLD,
            split: SplitPolicy::Newline,
            counter: Arc::new(WordTokenCounter),
        }
    }

    /// Create a chunker from the chunking fields of an [`EmbedConfig`].
    pub fn from_config(config: &EmbedConfig) -> Self {
        Self::new(config.max_tokens)
            .with_merge_threshold(config.merge_threshold)
            .with_split(config.split)
    }

    /// Set the split policy.
    pub fn with_split(mut self, split: SplitPolicy) -> Self {
        self.split = split;
        self
    }

    /// Set the token count below which a chunk is merged backward.
    pub fn with_merge_threshold(mut self, threshold: usize) -> Self {
        self.merge_threshold = threshold;
        self
    }

    /// Replace the token counter.
    pub fn with_token_counter(mut self, counter: Arc<dyn TokenCounter>) -> Self {
        self.counter = counter;
        self
    }

    /// Return the token counter used for chunk bounds.
    pub fn token_counter(&self) -> &Arc<dyn TokenCounter> {
        &self.counter
    }

    /// Greedily pack segments into buffers of at most `max_tokens` tokens.
    ///
    /// A single segment larger than `max_tokens` becomes its own piece. An
    /// empty buffer is never flushed.
    fn pack_segments(&self, content: &str) -> Vec<String> {
        let mut pieces = Vec::new();
        let mut buffer = String::new();
        let mut buffer_tokens = 0;

        for segment in self.split.segments(content) {
            let segment_tokens = self.counter.count(segment);
            if !buffer.trim().is_empty() && buffer_tokens + segment_tokens > self.max_tokens {
                pieces.push(std::mem::take(&mut buffer));
            }
            buffer.push_str(segment);
            buffer.push(' ');
            buffer_tokens = self.counter.count(&buffer);
        }

        if pieces.is_empty() || !buffer.trim().is_empty() {
            pieces.push(buffer);
        }
        pieces
    }

    fn make_chunk(&self, title: &str, index: usize, text: &str) -> Chunk {
        let content = text.trim().to_string();
        Chunk {
            title: format!("{title}-{index}"),
            content_length: content.chars().count(),
            content_tokens: self.counter.count(&content),
            content,
        }
    }

    /// Fold every chunk after the first that is below `merge_threshold` into
    /// the chunk before it, re-checking the same position after each fold.
    fn merge_small(&self, chunks: &mut Vec<Chunk>) {
        let mut i = 1;
        while i < chunks.len() {
            if chunks[i].content_tokens >= self.merge_threshold {
                i += 1;
                continue;
            }
            let small = chunks.remove(i);
            let prev = &mut chunks[i - 1];
            if !small.content.is_empty() {
                if !prev.content.is_empty() {
                    prev.content.push(' ');
                }
                prev.content.push_str(&small.content);
            }
            prev.content_length = prev.content.chars().count();
            prev.content_tokens = self.counter.count(&prev.content);
        }
    }
}

impl Chunker for TokenChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let total_tokens = self.counter.count(&document.content);

        let pieces = if total_tokens <= self.max_tokens {
            vec![document.content.clone()]
        } else {
            self.pack_segments(&document.content)
        };

        let mut chunks: Vec<Chunk> = pieces
            .iter()
            .enumerate()
            .map(|(i, text)| self.make_chunk(&document.title, i, text))
            .collect();
        let packed = chunks.len();

        self.merge_small(&mut chunks);

        debug!(
            document.title = %document.title,
            total_tokens,
            packed,
            chunk_count = chunks.len(),
            "chunked document"
        );
        chunks
    }
}

/// Split text at a separator while keeping the separator attached to the preceding segment.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut result = Vec::new();
    let mut start = 0;

    while let Some(pos) = text[start..].find(separator) {
        let end = start + pos + separator.len();
        result.push(&text[start..end]);
        start = end;
    }

    if start < text.len() || result.is_empty() {
        result.push(&text[start..]);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize, word: &str) -> String {
        vec![word; n].join(" ")
    }

    #[test]
    fn short_document_is_one_trimmed_chunk() {
        let chunker = TokenChunker::new(50);
        let chunks = chunker.chunk(&Document::new("doc", "  a\nb\nc \n"));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].title, "doc-0");
        assert_eq!(chunks[0].content, "a\nb\nc");
        assert_eq!(chunks[0].content_length, 5);
        assert_eq!(chunks[0].content_tokens, 3);
    }

    #[test]
    fn empty_document_yields_one_empty_chunk() {
        let chunks = TokenChunker::new(10).chunk(&Document::new("empty", ""));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].title, "empty-0");
        assert_eq!(chunks[0].content, "");
        assert_eq!(chunks[0].content_tokens, 0);
    }

    #[test]
    fn oversized_document_is_split_on_lines() {
        let text = [words(4, "alpha"), words(4, "beta"), words(4, "gamma")].join("\n");
        let chunker = TokenChunker::new(8).with_merge_threshold(0);
        let chunks = chunker.chunk(&Document::new("doc", text));

        let titles: Vec<_> = chunks.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, ["doc-0", "doc-1"]);
        assert_eq!(chunks[0].content, format!("{} {}", words(4, "alpha"), words(4, "beta")));
        assert_eq!(chunks[1].content, words(4, "gamma"));
        assert!(chunks.iter().all(|c| c.content_tokens <= 8));
    }

    #[test]
    fn flushing_line_starts_the_next_chunk() {
        let text = [words(5, "a"), words(5, "b")].join("\n");
        let chunks = TokenChunker::new(6).with_merge_threshold(0).chunk(&Document::new("d", text));
        assert_eq!(chunks.len(), 2);
        assert!(chunks[1].content.starts_with('b'));
    }

    #[test]
    fn single_oversized_line_is_not_preceded_by_an_empty_chunk() {
        let text = format!("{}\n{}", words(20, "big"), words(3, "tail"));
        let chunks = TokenChunker::new(5).with_merge_threshold(0).chunk(&Document::new("d", text));
        assert_eq!(chunks[0].content, words(20, "big"));
        assert_eq!(chunks[1].content, words(3, "tail"));
    }

    #[test]
    fn small_trailing_chunks_fold_backward() {
        let text = [words(10, "x"), words(2, "y"), words(2, "z")].join("\n");
        let chunker = TokenChunker::new(10).with_merge_threshold(5);
        let chunks = chunker.chunk(&Document::new("d", text));

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].title, "d-0");
        let expected = format!("{} {} {}", words(10, "x"), words(2, "y"), words(2, "z"));
        assert_eq!(chunks[0].content, expected);
        assert_eq!(chunks[0].content_tokens, 14);
        assert_eq!(chunks[0].content_length, chunks[0].content.chars().count());
    }

    #[test]
    fn surviving_chunks_keep_their_titles() {
        let text = [words(10, "x"), words(10, "y"), words(1, "z")].join("\n");
        let chunker = TokenChunker::new(10).with_merge_threshold(5);
        let chunks = chunker.chunk(&Document::new("d", text));
        let titles: Vec<_> = chunks.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, ["d-0", "d-1"]);
        assert!(chunks[1].content.ends_with('z'));
    }

    #[test]
    fn sentence_policy_keeps_periods() {
        let text = "One two three. Four five six. Seven eight nine.";
        let chunker =
            TokenChunker::new(5).with_merge_threshold(0).with_split(SplitPolicy::Sentence);
        let chunks = chunker.chunk(&Document::new("s", text));
        let contents: Vec<_> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, ["One two three.", "Four five six.", "Seven eight nine."]);
    }

    #[test]
    fn default_threshold_merges_many_small_pieces() {
        let text = (0..10).map(|_| words(10, "w")).collect::<Vec<_>>().join("\n");
        let chunks = TokenChunker::new(30).chunk(&Document::new("d", text));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content_tokens, 100);
    }

    #[test]
    fn split_keeping_separator_handles_edges() {
        assert_eq!(split_keeping_separator("", ". "), [""]);
        assert_eq!(split_keeping_separator("a. b", ". "), ["a. ", "b"]);
        assert_eq!(split_keeping_separator("a. ", ". "), ["a. "]);
    }
}
