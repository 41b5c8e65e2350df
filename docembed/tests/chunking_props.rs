//! Property tests for chunking and ranking invariants.

use std::collections::HashSet;

use docembed::{
    Chunker, Document, SplitPolicy, StoredEntry, TokenChunker, TokenCounter, WordTokenCounter,
    rank,
};
use proptest::prelude::*;

/// A line of 1-12 lowercase words.
fn arb_line() -> impl Strategy<Value = String> {
    proptest::collection::vec("[a-z]{1,8}", 1..12).prop_map(|words| words.join(" "))
}

/// Document text made of lines, optionally ending each line with a period.
fn arb_text() -> impl Strategy<Value = String> {
    (proptest::collection::vec(arb_line(), 0..40), any::<bool>()).prop_map(|(lines, periods)| {
        if periods {
            lines.iter().map(|l| format!("{l}.")).collect::<Vec<_>>().join(" ")
        } else {
            lines.join("\n")
        }
    })
}

fn arb_split() -> impl Strategy<Value = SplitPolicy> {
    prop_oneof![Just(SplitPolicy::Newline), Just(SplitPolicy::Sentence)]
}

fn arb_entry(dim: usize) -> impl Strategy<Value = StoredEntry> {
    ("[a-z]{3,8}", proptest::collection::vec(-1.0f32..1.0f32, dim)).prop_map(|(title, vector)| {
        StoredEntry { content: format!("{title} content"), title, vector }
    })
}

/// **Property: short documents are a single trimmed chunk**
mod prop_short_documents {
    use super::*;

    proptest! {
        #[test]
        fn fits_in_one_chunk(text in arb_text(), split in arb_split()) {
            let total = WordTokenCounter.count(&text);
            let chunker = TokenChunker::new(total.max(1)).with_split(split);
            let chunks = chunker.chunk(&Document::new("doc", text.clone()));

            prop_assert_eq!(chunks.len(), 1);
            prop_assert_eq!(&chunks[0].title, "doc-0");
            prop_assert_eq!(chunks[0].content.as_str(), text.trim());
        }
    }
}

/// **Property: chunking drops no text and honors the merge threshold**
mod prop_chunk_coverage {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn chunks_cover_the_document(
            text in arb_text(),
            split in arb_split(),
            max_tokens in 1usize..60,
            merge_threshold in 0usize..40,
        ) {
            let chunker = TokenChunker::new(max_tokens)
                .with_split(split)
                .with_merge_threshold(merge_threshold);
            let chunks = chunker.chunk(&Document::new("doc", text.clone()));

            prop_assert!(!chunks.is_empty());

            // No text is silently dropped, modulo whitespace.
            let rejoined: Vec<&str> =
                chunks.iter().flat_map(|c| c.content.split_whitespace()).collect();
            let original: Vec<&str> = text.split_whitespace().collect();
            prop_assert_eq!(rejoined, original);

            // Only the first chunk may fall below the merge threshold.
            for chunk in chunks.iter().skip(1) {
                prop_assert!(chunk.content_tokens >= merge_threshold);
            }

            // Token and length fields describe the content they sit next to.
            for chunk in &chunks {
                prop_assert_eq!(chunk.content_tokens, WordTokenCounter.count(&chunk.content));
                prop_assert_eq!(chunk.content_length, chunk.content.chars().count());
                prop_assert_eq!(chunk.content.trim(), chunk.content.as_str());
            }

            let titles: HashSet<_> = chunks.iter().map(|c| c.title.as_str()).collect();
            prop_assert_eq!(titles.len(), chunks.len());
        }

        #[test]
        fn chunking_is_deterministic(text in arb_text(), max_tokens in 1usize..60) {
            let chunker = TokenChunker::new(max_tokens).with_merge_threshold(5);
            let document = Document::new("doc", text);
            prop_assert_eq!(chunker.chunk(&document), chunker.chunk(&document));
        }
    }
}

/// **Property: ranking is bounded, filtered, ordered, and idempotent**
mod prop_rank {
    use super::*;

    const DIM: usize = 8;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn rank_respects_top_k_and_threshold(
            corpus in proptest::collection::vec(arb_entry(DIM), 0..30),
            query in proptest::collection::vec(-1.0f32..1.0f32, DIM),
            threshold in -1.0f32..1.0f32,
            top_k in 1usize..10,
        ) {
            let results = rank(&query, &corpus, threshold, top_k);

            prop_assert!(results.len() <= top_k);
            prop_assert!(results.iter().all(|r| r.similarity > threshold));
            for window in results.windows(2) {
                prop_assert!(
                    window[0].similarity >= window[1].similarity,
                    "results not in descending order: {} < {}",
                    window[0].similarity,
                    window[1].similarity,
                );
            }

            prop_assert_eq!(results, rank(&query, &corpus, threshold, top_k));
        }
    }
}
