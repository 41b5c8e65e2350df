//! Document sources.
//!
//! A [`DocumentSource`] produces the [`Document`]s to ingest. The only
//! built-in source is [`DirectorySource`], which reads every regular file in
//! one directory as UTF-8 text.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::document::Document;
use crate::error::{RagError, Result};

/// Something that can list documents for ingestion.
pub trait DocumentSource: Send + Sync {
    /// Read and return every document, in a stable order.
    fn list_documents(&self) -> Result<Vec<Document>>;
}

/// Reads each regular file directly inside a directory as one [`Document`].
///
/// Subdirectories are not descended into. Documents are titled with the
/// file name and returned sorted by it. Symlinks are followed. A file that
/// is not valid UTF-8, cannot be read, or cannot be listed (such as a dangling
/// symlink) is skipped with a warning, unless the source is
/// [`strict`](DirectorySource::strict), in which case the first such file
/// fails the whole listing.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
    strict: bool,
}

impl DirectorySource {
    /// Create a source over the files in `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), strict: false }
    }

    /// Fail the whole listing on the first unreadable file.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Return the directory this source reads from.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl DocumentSource for DirectorySource {
    fn list_documents(&self) -> Result<Vec<Document>> {
        if !self.root.is_dir() {
            return Err(RagError::SourceError {
                path: self.root.clone(),
                message: "not a directory".to_string(),
            });
        }

        let mut documents = Vec::new();
        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().unwrap_or(&self.root).to_path_buf();
                    if self.strict {
                        return Err(RagError::SourceError { path, message: e.to_string() });
                    }
                    warn!(path = %path.display(), error = %e, "skipping unlistable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let title = entry.file_name().to_string_lossy().into_owned();
            match fs::read_to_string(path) {
                Ok(content) => documents.push(Document { title, content }),
                Err(e) if self.strict => {
                    return Err(RagError::SourceError {
                        path: path.to_path_buf(),
                        message: e.to_string(),
                    });
                }
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable document"),
            }
        }

        debug!(root = %self.root.display(), count = documents.len(), "listed documents");
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_top_level_files_sorted_by_name() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("nested")).unwrap();
        fs::write(root.join("b.txt"), "second").unwrap();
        fs::write(root.join("a.md"), "first").unwrap();
        fs::write(root.join("nested/c.txt"), "ignored").unwrap();

        let docs = DirectorySource::new(root).list_documents().unwrap();
        assert_eq!(docs, vec![Document::new("a.md", "first"), Document::new("b.txt", "second")]);
    }

    #[test]
    fn non_utf8_file_is_skipped_unless_strict() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        fs::write(root.join("good.txt"), "ok").unwrap();
        fs::write(root.join("bad.bin"), [0xff, 0xfe, 0x00, 0xc3]).unwrap();

        let docs = DirectorySource::new(root).list_documents().unwrap();
        assert_eq!(docs, vec![Document::new("good.txt", "ok")]);

        let err = DirectorySource::new(root).strict(true).list_documents().unwrap_err();
        assert!(matches!(err, RagError::SourceError { path, .. } if path.ends_with("bad.bin")));
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_is_skipped_unless_strict() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        fs::write(root.join("good.txt"), "ok").unwrap();
        std::os::unix::fs::symlink(root.join("gone.txt"), root.join("link.txt")).unwrap();

        let docs = DirectorySource::new(root).list_documents().unwrap();
        assert_eq!(docs, vec![Document::new("good.txt", "ok")]);

        let err = DirectorySource::new(root).strict(true).list_documents().unwrap_err();
        assert!(matches!(err, RagError::SourceError { path, .. } if path.ends_with("link.txt")));
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_file_is_read() {
        let temp = tempfile::tempdir().unwrap();
        let target = tempfile::tempdir().unwrap();
        fs::write(target.path().join("real.txt"), "linked").unwrap();
        std::os::unix::fs::symlink(target.path().join("real.txt"), temp.path().join("alias.txt"))
            .unwrap();

        let docs = DirectorySource::new(temp.path()).list_documents().unwrap();
        assert_eq!(docs, vec![Document::new("alias.txt", "linked")]);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let temp = tempfile::tempdir().unwrap();
        let err = DirectorySource::new(temp.path().join("nope")).list_documents().unwrap_err();
        assert!(matches!(err, RagError::SourceError { .. }));
    }
}
