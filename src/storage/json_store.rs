//! Whole-document JSON file with serialized read-modify-write.
//!
//! Every change loads the full document, mutates it in memory, and writes
//! it back atomically. That is O(n) per write, which is fine for a personal
//! journal but not for unbounded collections. Callers only see
//! `load_all`/`replace_all`/`update`, so the file can later be swapped for an
//! indexed store without touching them.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex, OnceLock, PoisonError};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{write_atomic, StorageError};

/// A JSON store holding a sequence of records
pub type CollectionStore<T> = JsonStore<Vec<T>>;

/// Process-wide file locks, shared by every store opened on the same path
static FILE_LOCKS: OnceLock<StdMutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();

fn lock_for(path: &Path) -> Arc<Mutex<()>> {
    let mut locks = FILE_LOCKS
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner);

    Arc::clone(locks.entry(lock_key(path)).or_default())
}

/// Resolve the parent directory so different spellings of one file share a lock
fn lock_key(path: &Path) -> PathBuf {
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) if !parent.as_os_str().is_empty() => {
            std::fs::canonicalize(parent)
                .map(|dir| dir.join(name))
                .unwrap_or_else(|_| path.to_path_buf())
        }
        _ => std::env::current_dir()
            .map(|dir| dir.join(path))
            .unwrap_or_else(|_| path.to_path_buf()),
    }
}

/// One JSON document on disk, guarded by a per-file lock
pub struct JsonStore<D> {
    /// Path to the backing file
    path: PathBuf,

    /// Held for the whole read-modify-write cycle; shared per file
    lock: Arc<Mutex<()>>,

    _document: PhantomData<fn() -> D>,
}

impl<D> JsonStore<D>
where
    D: Default + Serialize + DeserializeOwned,
{
    /// Create a store backed by `path` (the file need not exist yet)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            lock: lock_for(&path),
            path,
            _document: PhantomData,
        }
    }

    /// Get the path to the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the whole document.
    ///
    /// A missing or unreadable file yields the empty document; corruption is
    /// logged, never returned.
    pub async fn load_all(&self) -> D {
        let _guard = self.lock.lock().await;

        match self.read().await {
            Ok(document) => document,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Unreadable store file, treating as empty");
                D::default()
            }
        }
    }

    /// Overwrite the whole document
    pub async fn replace_all(&self, document: &D) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        self.write(document).await
    }

    /// Run a read-modify-write cycle under the file lock.
    ///
    /// `apply` returns `None` when it changed nothing, in which case the file
    /// is not rewritten. Unlike `load_all`, a corrupt file fails the update
    /// instead of being silently replaced.
    pub async fn update<F, R>(&self, apply: F) -> Result<Option<R>, StorageError>
    where
        F: FnOnce(&mut D) -> Option<R>,
    {
        let _guard = self.lock.lock().await;

        let mut document = self.read().await?;
        let Some(result) = apply(&mut document) else {
            debug!(path = %self.path.display(), "Update changed nothing, skipping write");
            return Ok(None);
        };

        self.write(&document).await?;
        Ok(Some(result))
    }

    /// Delete the backing file
    pub async fn clear(&self) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;

        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(&self.path, e)),
        }
    }

    async fn read(&self) -> Result<D, StorageError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(D::default()),
            Err(e) => return Err(StorageError::io(&self.path, e)),
        };

        serde_json::from_slice(&bytes).map_err(|source| StorageError::Decoding {
            path: self.path.clone(),
            source,
        })
    }

    async fn write(&self, document: &D) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(document).map_err(|source| StorageError::Encoding {
            what: self.path.display().to_string(),
            source,
        })?;

        write_atomic(&self.path, bytes).await
    }
}
