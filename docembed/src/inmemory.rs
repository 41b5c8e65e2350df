//! In-memory entry store.
//!
//! This module provides [`InMemoryEntryStore`], a zero-dependency store
//! backed by a `Vec` protected by a `tokio::sync::RwLock`. It is suitable
//! for development, testing, and single-process use.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::StoredEntry;
use crate::error::{RagError, Result};
use crate::store::EntryStore;

/// Entries in insertion order plus a title → position index.
#[derive(Debug, Default)]
pub(crate) struct EntryTable {
    entries: Vec<StoredEntry>,
    by_title: HashMap<String, usize>,
}

impl EntryTable {
    pub(crate) fn from_entries(entries: Vec<StoredEntry>) -> Result<Self> {
        let mut table = Self::default();
        for entry in entries {
            table.insert(entry)?;
        }
        Ok(table)
    }

    pub(crate) fn get(&self, title: &str) -> Option<&StoredEntry> {
        self.by_title.get(title).map(|&i| &self.entries[i])
    }

    pub(crate) fn insert(&mut self, entry: StoredEntry) -> Result<()> {
        if self.by_title.contains_key(&entry.title) {
            return Err(RagError::DuplicateEntry(entry.title));
        }
        self.by_title.insert(entry.title.clone(), self.entries.len());
        self.entries.push(entry);
        Ok(())
    }

    pub(crate) fn entries(&self) -> &[StoredEntry] {
        &self.entries
    }
}

/// An in-memory [`EntryStore`].
///
/// All operations are async-safe via `tokio::sync::RwLock`; the duplicate
/// check and the insert in [`create`](EntryStore::create) happen under one
/// write lock.
///
/// # Example
///
/// ```rust,ignore
/// use docembed::{InMemoryEntryStore, EntryStore};
///
/// let store = InMemoryEntryStore::new();
/// store.create(entry).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryEntryStore {
    table: RwLock<EntryTable>,
}

impl InMemoryEntryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntryStore for InMemoryEntryStore {
    async fn ensure_ready(&self, _dimensions: usize) -> Result<()> {
        Ok(())
    }

    async fn find_by_title(&self, title: &str) -> Result<Option<StoredEntry>> {
        Ok(self.table.read().await.get(title).cloned())
    }

    async fn create(&self, entry: StoredEntry) -> Result<()> {
        self.table.write().await.insert(entry)
    }

    async fn list_all(&self) -> Result<Vec<StoredEntry>> {
        Ok(self.table.read().await.entries().to_vec())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.table.read().await.entries().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(title: &str) -> StoredEntry {
        StoredEntry { title: title.to_string(), content: "text".to_string(), vector: vec![1.0] }
    }

    #[tokio::test]
    async fn create_then_find() {
        let store = InMemoryEntryStore::new();
        store.create(entry("a-0")).await.unwrap();
        assert_eq!(store.find_by_title("a-0").await.unwrap(), Some(entry("a-0")));
        assert_eq!(store.find_by_title("a-1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn duplicate_title_is_rejected() {
        let store = InMemoryEntryStore::new();
        store.create(entry("a-0")).await.unwrap();
        let err = store.create(entry("a-0")).await.unwrap_err();
        assert!(matches!(err, RagError::DuplicateEntry(title) if title == "a-0"));
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn list_all_preserves_insertion_order() {
        let store = InMemoryEntryStore::new();
        for title in ["c", "a", "b"] {
            store.create(entry(title)).await.unwrap();
        }
        let titles: Vec<_> =
            store.list_all().await.unwrap().into_iter().map(|e| e.title).collect();
        assert_eq!(titles, ["c", "a", "b"]);
    }

    #[tokio::test]
    async fn upsert_batch_skips_existing_titles() {
        let store = InMemoryEntryStore::new();
        store.create(entry("a")).await.unwrap();
        let written = store.upsert_batch(&[entry("a"), entry("b"), entry("b")]).await.unwrap();
        assert_eq!(written, 1);
        assert_eq!(store.len().await.unwrap(), 2);
        assert!(!store.is_empty().await.unwrap());
    }
}
