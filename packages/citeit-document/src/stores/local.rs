//! Local filesystem archive.
//!
//! Payloads live at `<root>/<key>`, where keys are archive paths such as
//! `pdf/example.org%2Fa.pdf`. Writes go to a temporary sibling first and
//! are renamed into place, so racing writers never leave a torn file.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use crate::error::{DocumentError, Result};
use crate::traits::store::ArchiveStore;

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Archive rooted at a directory on disk.
#[derive(Debug, Clone)]
pub struct LocalArchive {
    root: PathBuf,
}

impl LocalArchive {
    /// Create an archive under `root`. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path for a key. Keys may not escape the root.
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if key.is_empty() || escapes {
            return Err(DocumentError::storage(std::io::Error::new(
                ErrorKind::InvalidInput,
                format!("archive key escapes root: {key}"),
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ArchiveStore for LocalArchive {
    async fn exists(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key)?;
        tokio::fs::try_exists(&path)
            .await
            .map_err(DocumentError::storage)
    }

    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(DocumentError::storage(e)),
        }
    }

    async fn write(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(DocumentError::storage)?;
        }

        let n = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut tmp = path.clone().into_os_string();
        tmp.push(format!(".{}.{}.tmp", std::process::id(), n));
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(DocumentError::storage)?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(DocumentError::storage(e));
        }

        debug!(path = %path.display(), bytes = bytes.len(), content_type = %content_type, "Archived payload");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::{archive_path, text_path};
    use crate::types::doc_type::DocType;

    #[tokio::test]
    async fn test_write_read_exists() {
        let dir = tempfile::tempdir().unwrap();
        let archive = LocalArchive::new(dir.path());
        let key = archive_path(&DocType::Pdf, "example.org/papers/a.pdf");

        assert!(!archive.exists(&key).await.unwrap());
        archive.write(&key, b"%PDF-1.4", "application/pdf").await.unwrap();

        assert!(archive.exists(&key).await.unwrap());
        assert_eq!(archive.read(&key).await.unwrap().unwrap(), b"%PDF-1.4");
        assert!(dir.path().join("pdf/example.org%2Fpapers%2Fa.pdf").is_file());
    }

    #[tokio::test]
    async fn test_text_artifact_naming() {
        let dir = tempfile::tempdir().unwrap();
        let archive = LocalArchive::new(dir.path());
        let key = text_path(&DocType::Html, "example.com/a");

        archive.write(&key, "Hello".as_bytes(), "text/plain").await.unwrap();
        assert!(dir.path().join("html/example.com%2Fa.txt").is_file());
    }

    #[tokio::test]
    async fn test_missing_key_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        let archive = LocalArchive::new(dir.path());
        assert!(archive.read("html/nothing").await.unwrap().is_none());
    }

    #[test]
    fn test_rejects_escaping_keys() {
        let archive = LocalArchive::new("/tmp/archive");
        assert!(archive.path_for("../etc/passwd").is_err());
        assert!(archive.path_for("/etc/passwd").is_err());
        assert!(archive.path_for("").is_err());
        assert!(archive.path_for("html/a").is_ok());
    }
}
