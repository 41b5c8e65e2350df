//! Entry store persisted to a single JSON file.
//!
//! [`JsonFileStore`] keeps the same in-memory table as
//! [`InMemoryEntryStore`](crate::inmemory::InMemoryEntryStore) and rewrites
//! the whole file after each insert, so separate processes (an `ingest` run
//! followed by a `search` run) see the same entries. The file is written to
//! a sibling temp file and renamed into place, so a crash mid-write leaves
//! the previous contents intact.
//!
//! Every operation re-reads the file before answering, and
//! [`create`](EntryStore::create) checks titles against the file's current
//! contents, so several handles on one file (in one process or several) see
//! each other's entries and never overwrite them. The read and the rename
//! are not guarded by a file lock: writers that interleave inside that window
//! can still drop an entry. Runs that write truly in parallel should use the
//! `pgvector` backend.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::document::StoredEntry;
use crate::error::{RagError, Result};
use crate::inmemory::EntryTable;
use crate::store::EntryStore;

const BACKEND: &str = "json-file";

/// A file-backed [`EntryStore`].
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    table: RwLock<EntryTable>,
}

impl JsonFileStore {
    /// Open the store at `path`, loading existing entries if the file exists.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::StoreError`] if the file exists but cannot be read
    /// or does not contain a JSON array of entries, or contains duplicate
    /// titles.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let table = Self::load(&path).await?.unwrap_or_default();
        debug!(path = %path.display(), entries = table.entries().len(), "opened json store");
        Ok(Self { path, table: RwLock::new(table) })
    }

    /// Read the table stored at `path`, or `None` if the file does not exist.
    async fn load(path: &Path) -> Result<Option<EntryTable>> {
        let entries = match tokio::fs::read(path).await {
            Ok(bytes) => serde_json::from_slice::<Vec<StoredEntry>>(&bytes).map_err(|e| {
                RagError::store(BACKEND, format!("failed to parse {}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(RagError::store(
                    BACKEND,
                    format!("failed to read {}: {e}", path.display()),
                ));
            }
        };
        let table = EntryTable::from_entries(entries).map_err(|e| {
            RagError::store(BACKEND, format!("corrupt store {}: {e}", path.display()))
        })?;
        Ok(Some(table))
    }

    /// Pick up entries written to the file by other handles.
    ///
    /// The file's entries come first, in file order; entries only this handle
    /// holds (the file was removed or never written) follow them.
    async fn refresh(&self, table: &mut EntryTable) -> Result<()> {
        let Some(mut on_disk) = Self::load(&self.path).await? else {
            return Ok(());
        };
        for entry in table.entries() {
            if on_disk.get(&entry.title).is_none() {
                on_disk.insert(entry.clone())?;
            }
        }
        *table = on_disk;
        Ok(())
    }

    /// Return the path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, entries: &[&StoredEntry]) -> Result<()> {
        let bytes = serde_json::to_vec(entries)
            .map_err(|e| RagError::store(BACKEND, format!("failed to serialize entries: {e}")))?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await.map_err(|e| {
            RagError::store(BACKEND, format!("failed to write {}: {e}", tmp.display()))
        })?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            RagError::store(BACKEND, format!("failed to replace {}: {e}", self.path.display()))
        })
    }
}

#[async_trait]
impl EntryStore for JsonFileStore {
    async fn ensure_ready(&self, _dimensions: usize) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                RagError::store(BACKEND, format!("failed to create {}: {e}", parent.display()))
            })?;
        }
        if tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(());
        }
        let table = self.table.read().await;
        let entries: Vec<&StoredEntry> = table.entries().iter().collect();
        self.persist(&entries).await
    }

    async fn find_by_title(&self, title: &str) -> Result<Option<StoredEntry>> {
        let mut table = self.table.write().await;
        self.refresh(&mut table).await?;
        Ok(table.get(title).cloned())
    }

    async fn create(&self, entry: StoredEntry) -> Result<()> {
        let mut table = self.table.write().await;
        self.refresh(&mut table).await?;
        if table.get(&entry.title).is_some() {
            return Err(RagError::DuplicateEntry(entry.title));
        }
        // Write the file first so a failed write leaves memory and disk in agreement.
        let entries: Vec<&StoredEntry> =
            table.entries().iter().chain(std::iter::once(&entry)).collect();
        self.persist(&entries).await?;
        table.insert(entry)
    }

    async fn list_all(&self) -> Result<Vec<StoredEntry>> {
        let mut table = self.table.write().await;
        self.refresh(&mut table).await?;
        Ok(table.entries().to_vec())
    }

    async fn len(&self) -> Result<usize> {
        let mut table = self.table.write().await;
        self.refresh(&mut table).await?;
        Ok(table.entries().len())
    }
}
