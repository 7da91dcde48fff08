//! Filesystem storage backend.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;
use tracing::info;
use uuid::Uuid;

use super::{BlobStore, EntryStore, ReportStore, SettingsStore, Storage, StorageError};
use crate::config::paths;
use crate::domain::{Attachment, DoctorReport, SymptomEntry};

/// All typed stores rooted at one application-private directory
pub struct LocalStore {
    root: PathBuf,
    entries: EntryStore,
    reports: ReportStore,
    settings: SettingsStore,
    blobs: Arc<BlobStore>,
}

impl LocalStore {
    /// Open (and create if needed) a store rooted at `root`
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        let attachments_dir = paths::attachments_dir_in(&root);

        fs::create_dir_all(&attachments_dir)
            .await
            .map_err(|e| StorageError::io(&attachments_dir, e))?;

        let blobs = Arc::new(BlobStore::new(attachments_dir));

        Ok(Self {
            entries: EntryStore::new(paths::entries_file_in(&root), Arc::clone(&blobs)),
            reports: ReportStore::new(paths::reports_file_in(&root)),
            settings: SettingsStore::new(paths::settings_file_in(&root)),
            blobs,
            root,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entries(&self) -> &EntryStore {
        &self.entries
    }

    pub fn reports(&self) -> &ReportStore {
        &self.reports
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }
}

#[async_trait]
impl Storage for LocalStore {
    fn name(&self) -> &str {
        "local"
    }

    async fn save_entry(&self, entry: &SymptomEntry) -> Result<(), StorageError> {
        self.entries.save(entry).await
    }

    async fn load_entries(&self) -> Result<Vec<SymptomEntry>, StorageError> {
        Ok(self.entries.load_all().await)
    }

    async fn delete_entry(&self, id: Uuid) -> Result<(), StorageError> {
        self.entries.delete(id).await.map(|_| ())
    }

    async fn save_attachment(
        &self,
        bytes: &[u8],
        filename: &str,
    ) -> Result<Attachment, StorageError> {
        self.blobs.save(bytes, filename).await
    }

    async fn load_attachment(&self, attachment: &Attachment) -> Result<Vec<u8>, StorageError> {
        self.blobs.load(attachment).await
    }

    async fn delete_attachment(&self, attachment: &Attachment) -> Result<(), StorageError> {
        self.blobs.delete(attachment).await
    }

    async fn save_report(&self, report: &DoctorReport) -> Result<(), StorageError> {
        self.reports.save(report).await
    }

    async fn load_reports(&self) -> Result<Vec<DoctorReport>, StorageError> {
        Ok(self.reports.load_all().await)
    }

    async fn save_setting(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.settings.set_raw(key, value).await
    }

    async fn load_setting(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.settings.get_raw(key).await)
    }

    async fn clear_all(&self) -> Result<(), StorageError> {
        self.entries.clear().await?;
        self.reports.clear().await?;
        self.settings.clear().await?;
        self.blobs.clear().await?;

        info!(root = %self.root.display(), "Cleared all local data");
        Ok(())
    }
}
