//! Attachment blob storage.
//!
//! Each blob is a standalone file named `{id}.{ext}`. Blobs are independent,
//! so no locking is needed between them.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::{write_atomic, StorageError};
use crate::domain::{Attachment, AttachmentKind};

/// Extension used when the original filename has none
const FALLBACK_EXTENSION: &str = "bin";

/// Longest extension kept from an original filename
const MAX_EXTENSION_LEN: usize = 8;

/// File-per-blob attachment store
pub struct BlobStore {
    /// Directory holding the blob files
    dir: PathBuf,
}

impl BlobStore {
    /// Create a blob store rooted at `dir` (created lazily on first save)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Get the blob directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Store `bytes` under a fresh id and describe the result
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn save(&self, bytes: &[u8], filename: &str) -> Result<Attachment, StorageError> {
        let id = Uuid::new_v4();
        let extension = sanitize_extension(filename);
        let path = self.dir.join(format!("{}.{}", id, extension));

        write_atomic(&path, bytes.to_vec()).await?;

        let kind = AttachmentKind::classify(&extension, bytes);
        let attachment = Attachment::new(id, filename.to_string(), path, kind)
            .with_metadata("size_bytes", bytes.len().to_string())
            .with_metadata("sha256", hex::encode(Sha256::digest(bytes)));

        info!(%id, kind = kind.display_name(), "Stored attachment");
        Ok(attachment)
    }

    /// Read a blob back
    pub async fn load(&self, attachment: &Attachment) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(attachment);

        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound(path)),
            Err(e) => Err(StorageError::io(&path, e)),
        }
    }

    /// Delete a blob; already-missing blobs are not an error
    pub async fn delete(&self, attachment: &Attachment) -> Result<(), StorageError> {
        let path = self.resolve(attachment);

        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(id = %attachment.id, "Deleted attachment blob");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(&path, e)),
        }
    }

    /// Remove every blob
    pub async fn clear(&self) -> Result<(), StorageError> {
        match fs::remove_dir_all(&self.dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(StorageError::io(&self.dir, e)),
        }

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StorageError::io(&self.dir, e))
    }

    /// Blob location for an attachment.
    ///
    /// Only the file name of the stored reference is trusted, so a moved data
    /// directory still resolves and a tampered path cannot escape `dir`.
    fn resolve(&self, attachment: &Attachment) -> PathBuf {
        match attachment.local_path.file_name() {
            Some(name) => self.dir.join(name),
            None => self.dir.join(attachment.id.to_string()),
        }
    }
}

/// Lowercased ASCII-alphanumeric extension of `filename`
fn sanitize_extension(filename: &str) -> String {
    let extension: String = Path::new(filename)
        .extension()
        .map(|ext| ext.to_string_lossy().to_string())
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(MAX_EXTENSION_LEN)
        .collect::<String>()
        .to_lowercase();

    if extension.is_empty() {
        FALLBACK_EXTENSION.to_string()
    } else {
        extension
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (BlobStore, TempDir) {
        let temp = TempDir::new().unwrap();
        let store = BlobStore::new(temp.path().join("attachments"));
        (store, temp)
    }

    #[test]
    fn test_sanitize_extension() {
        assert_eq!(sanitize_extension("Photo.JPG"), "jpg");
        assert_eq!(sanitize_extension("notes"), "bin");
        assert_eq!(sanitize_extension("x.p/d$f"), "bin");
        assert_eq!(sanitize_extension("scan.p$df"), "pdf");
        assert_eq!(sanitize_extension("weird.abcdefghijkl"), "abcdefgh");
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let (store, _temp) = create_test_store();

        let attachment = store.save(b"%PDF-1.4 lab results", "labs.PDF").await.unwrap();

        assert_eq!(attachment.filename, "labs.PDF");
        assert_eq!(attachment.kind, AttachmentKind::Document);
        assert_eq!(
            attachment.local_path,
            store.dir().join(format!("{}.pdf", attachment.id))
        );
        assert_eq!(attachment.metadata.get("size_bytes").map(String::as_str), Some("20"));
        assert_eq!(attachment.metadata["sha256"].len(), 64);

        let bytes = store.load(&attachment).await.unwrap();
        assert_eq!(bytes, b"%PDF-1.4 lab results");
    }

    #[tokio::test]
    async fn test_image_classification() {
        let (store, _temp) = create_test_store();

        let by_ext = store.save(b"whatever", "rash.heic").await.unwrap();
        assert!(by_ext.is_image());

        let by_signature = store.save(&[0xFF, 0xD8, 0xFF, 0xE0], "capture").await.unwrap();
        assert!(by_signature.is_image());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (store, _temp) = create_test_store();
        let attachment = store.save(b"data", "a.png").await.unwrap();

        store.delete(&attachment).await.unwrap();
        store.delete(&attachment).await.unwrap();

        let result = store.load(&attachment).await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_resolve_ignores_foreign_directories() {
        let (store, temp) = create_test_store();
        let mut attachment = store.save(b"data", "a.png").await.unwrap();

        let file_name = attachment.local_path.file_name().unwrap().to_owned();
        attachment.local_path = temp.path().join("elsewhere").join(file_name);

        assert_eq!(store.load(&attachment).await.unwrap(), b"data");
    }
}
