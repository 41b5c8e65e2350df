//! Entry store trait for persisting embedded chunks.

use async_trait::async_trait;

use crate::document::StoredEntry;
use crate::error::{RagError, Result};

/// A storage backend for [`StoredEntry`] records keyed by title.
///
/// Stores enforce title uniqueness themselves: [`create`](EntryStore::create)
/// on a title that already exists fails with [`RagError::DuplicateEntry`]
/// instead of writing a second record. This is what keeps ingestion
/// idempotent even when two runs race past the same existence check.
///
/// # Example
///
/// ```rust,ignore
/// use docembed::{EntryStore, InMemoryEntryStore};
///
/// let store = InMemoryEntryStore::new();
/// store.ensure_ready(1536).await?;
/// if store.find_by_title("intro.txt-0").await?.is_none() {
///     store.create(entry).await?;
/// }
/// let all = store.list_all().await?;
/// ```
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Prepare the backend (tables, indexes, files). Safe to call repeatedly.
    async fn ensure_ready(&self, dimensions: usize) -> Result<()>;

    /// Look up an entry by its unique title.
    async fn find_by_title(&self, title: &str) -> Result<Option<StoredEntry>>;

    /// Insert a new entry.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::DuplicateEntry`] if an entry with the same title
    /// already exists.
    async fn create(&self, entry: StoredEntry) -> Result<()>;

    /// Return every stored entry in insertion order.
    async fn list_all(&self) -> Result<Vec<StoredEntry>>;

    /// Insert every entry whose title is not stored yet; existing titles are
    /// left untouched. Returns the number of entries written.
    ///
    /// The default implementation calls [`create`](EntryStore::create) for
    /// each entry. Backends with bulk writes should override it.
    async fn upsert_batch(&self, entries: &[StoredEntry]) -> Result<usize> {
        let mut written = 0;
        for entry in entries {
            match self.create(entry.clone()).await {
                Ok(()) => written += 1,
                Err(RagError::DuplicateEntry(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(written)
    }

    /// Return the number of stored entries.
    async fn len(&self) -> Result<usize> {
        Ok(self.list_all().await?.len())
    }

    /// Return `true` if nothing has been stored yet.
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}
