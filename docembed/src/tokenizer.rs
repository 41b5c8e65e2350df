//! Token counting used to bound chunk sizes.
//!
//! Chunk boundaries only need a deterministic count that never shrinks when
//! text is appended. [`WordTokenCounter`] is the dependency-free default;
//! [`HfTokenCounter`] (feature `hf-tokenizer`) counts with a real model
//! vocabulary loaded from a `tokenizer.json`.

use unicode_segmentation::UnicodeSegmentation;

/// Counts tokens in a piece of text.
///
/// Implementations must return `0` for the empty string and must be
/// deterministic: the same text always yields the same count.
pub trait TokenCounter: Send + Sync {
    /// Return the number of tokens in `text`.
    fn count(&self, text: &str) -> usize;
}

/// Approximates a BPE tokenizer by counting Unicode word-boundary segments.
///
/// Every word, number, and punctuation mark is one token; whitespace is free.
/// This over-counts slightly compared to GPT-style vocabularies for
/// punctuation-heavy text and under-counts long rare words.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordTokenCounter;

impl TokenCounter for WordTokenCounter {
    fn count(&self, text: &str) -> usize {
        text.split_word_bounds().filter(|segment| !segment.trim().is_empty()).count()
    }
}

#[cfg(feature = "hf-tokenizer")]
pub use hf::HfTokenCounter;

#[cfg(feature = "hf-tokenizer")]
mod hf {
    use std::path::Path;

    use tokenizers::Tokenizer;
    use tracing::warn;

    use super::{TokenCounter, WordTokenCounter};
    use crate::error::{RagError, Result};

    /// A [`TokenCounter`] backed by a HuggingFace `tokenizers` vocabulary.
    ///
    /// Special tokens are not counted, so the count reflects the text alone.
    pub struct HfTokenCounter {
        tokenizer: Tokenizer,
    }

    impl HfTokenCounter {
        /// Load a tokenizer from a `tokenizer.json` file.
        pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
            let path = path.as_ref();
            let tokenizer = Tokenizer::from_file(path).map_err(|e| {
                RagError::ConfigError(format!(
                    "failed to load tokenizer from {}: {e}",
                    path.display()
                ))
            })?;
            Ok(Self { tokenizer })
        }

        /// Load a tokenizer from the raw contents of a `tokenizer.json`.
        pub fn from_bytes(bytes: impl AsRef<[u8]>) -> Result<Self> {
            let tokenizer = Tokenizer::from_bytes(bytes)
                .map_err(|e| RagError::ConfigError(format!("failed to parse tokenizer: {e}")))?;
            Ok(Self { tokenizer })
        }
    }

    impl TokenCounter for HfTokenCounter {
        fn count(&self, text: &str) -> usize {
            if text.is_empty() {
                return 0;
            }
            match self.tokenizer.encode(text, false) {
                Ok(encoding) => encoding.len(),
                Err(e) => {
                    warn!(error = %e, text_len = text.len(), "tokenizer failed, using word count");
                    WordTokenCounter.count(text)
                }
            }
        }
    }
}
