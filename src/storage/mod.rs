//! Local persistence for entries, attachments, reports, and settings.
//!
//! Every typed store sits on [`JsonStore`], which keeps one collection per
//! JSON file and rewrites the whole file on each change. Writes go through
//! a temp file that is renamed into place, so a crash mid-write leaves the
//! previous contents intact.
//!
//! ```text
//! <home>/
//!   entries.json        newest-first SymptomEntry list
//!   reports.json        newest-first DoctorReport list
//!   settings.json       key -> JSON value
//!   attachments/        one blob per attachment: {id}.{ext}
//! ```

pub mod blob;
pub mod cloud;
pub mod entries;
pub mod json_store;
pub mod local;
pub mod reports;
pub mod settings;

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{Attachment, DoctorReport, SymptomEntry};

pub use blob::BlobStore;
pub use cloud::CloudStore;
pub use entries::EntryStore;
pub use json_store::{CollectionStore, JsonStore};
pub use local::LocalStore;
pub use reports::ReportStore;
pub use settings::SettingsStore;

/// Errors that can occur in the storage layer
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode {what}: {source}")]
    Encoding {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to decode {}: {source}", .path.display())]
    Decoding {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Entry text is empty")]
    EmptyEntryText,

    #[error("{0} is not implemented yet")]
    NotImplemented(&'static str),
}

impl StorageError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A persisted record with an identity and a sort timestamp
pub trait Record {
    fn record_id(&self) -> Uuid;

    /// Collections are kept sorted by this, newest first
    fn timestamp(&self) -> DateTime<Utc>;
}

impl Record for SymptomEntry {
    fn record_id(&self) -> Uuid {
        self.id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Record for DoctorReport {
    fn record_id(&self) -> Uuid {
        self.id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.generated_at
    }
}

/// Insert or replace `record` by id, then re-sort newest first
pub fn upsert<T: Record>(records: &mut Vec<T>, record: T) {
    let id = record.record_id();
    records.retain(|existing| existing.record_id() != id);
    records.push(record);
    records.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
}

/// Storage backend used by the composition pipeline and the CLI
#[async_trait]
pub trait Storage: Send + Sync {
    /// Human-readable backend name
    fn name(&self) -> &str;

    async fn save_entry(&self, entry: &SymptomEntry) -> Result<(), StorageError>;

    async fn load_entries(&self) -> Result<Vec<SymptomEntry>, StorageError>;

    /// Delete an entry and its attachment blobs (no-op for unknown ids)
    async fn delete_entry(&self, id: Uuid) -> Result<(), StorageError>;

    async fn save_attachment(
        &self,
        bytes: &[u8],
        filename: &str,
    ) -> Result<Attachment, StorageError>;

    async fn load_attachment(&self, attachment: &Attachment) -> Result<Vec<u8>, StorageError>;

    async fn delete_attachment(&self, attachment: &Attachment) -> Result<(), StorageError>;

    async fn save_report(&self, report: &DoctorReport) -> Result<(), StorageError>;

    async fn load_reports(&self) -> Result<Vec<DoctorReport>, StorageError>;

    async fn save_setting(&self, key: &str, value: Value) -> Result<(), StorageError>;

    async fn load_setting(&self, key: &str) -> Result<Option<Value>, StorageError>;

    /// Remove every entry, report, setting, and blob
    async fn clear_all(&self) -> Result<(), StorageError>;
}

/// Write `bytes` to a temp file next to `path`, fsync, and rename over `path`
pub(crate) async fn write_atomic(path: &Path, bytes: Vec<u8>) -> Result<(), StorageError> {
    let path = path.to_path_buf();

    tokio::task::spawn_blocking(move || {
        let dir = path.parent().unwrap_or(Path::new("."));
        std::fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| StorageError::io(dir, e))?;
        tmp.write_all(&bytes)
            .map_err(|e| StorageError::io(tmp.path(), e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| StorageError::io(tmp.path(), e))?;
        tmp.persist(&path)
            .map_err(|e| StorageError::io(&path, e.error))?;

        Ok(())
    })
    .await
    .map_err(|e| StorageError::Io {
        path: PathBuf::new(),
        source: std::io::Error::new(std::io::ErrorKind::Other, e),
    })?
}
