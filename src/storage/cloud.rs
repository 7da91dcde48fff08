//! Remote storage backend placeholder.
//!
//! Selected when `cloud_storage_enabled` is set; every operation fails with
//! [`StorageError::NotImplemented`] until a sync service exists.

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use super::{Storage, StorageError};
use crate::domain::{Attachment, DoctorReport, SymptomEntry};

const BACKEND: &str = "Cloud storage";

/// Cloud storage backend (not yet available)
#[derive(Debug, Default)]
pub struct CloudStore;

impl CloudStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Storage for CloudStore {
    fn name(&self) -> &str {
        "cloud"
    }

    async fn save_entry(&self, _entry: &SymptomEntry) -> Result<(), StorageError> {
        Err(StorageError::NotImplemented(BACKEND))
    }

    async fn load_entries(&self) -> Result<Vec<SymptomEntry>, StorageError> {
        Err(StorageError::NotImplemented(BACKEND))
    }

    async fn delete_entry(&self, _id: Uuid) -> Result<(), StorageError> {
        Err(StorageError::NotImplemented(BACKEND))
    }

    async fn save_attachment(
        &self,
        _bytes: &[u8],
        _filename: &str,
    ) -> Result<Attachment, StorageError> {
        Err(StorageError::NotImplemented(BACKEND))
    }

    async fn load_attachment(&self, _attachment: &Attachment) -> Result<Vec<u8>, StorageError> {
        Err(StorageError::NotImplemented(BACKEND))
    }

    async fn delete_attachment(&self, _attachment: &Attachment) -> Result<(), StorageError> {
        Err(StorageError::NotImplemented(BACKEND))
    }

    async fn save_report(&self, _report: &DoctorReport) -> Result<(), StorageError> {
        Err(StorageError::NotImplemented(BACKEND))
    }

    async fn load_reports(&self) -> Result<Vec<DoctorReport>, StorageError> {
        Err(StorageError::NotImplemented(BACKEND))
    }

    async fn save_setting(&self, _key: &str, _value: Value) -> Result<(), StorageError> {
        Err(StorageError::NotImplemented(BACKEND))
    }

    async fn load_setting(&self, _key: &str) -> Result<Option<Value>, StorageError> {
        Err(StorageError::NotImplemented(BACKEND))
    }

    async fn clear_all(&self) -> Result<(), StorageError> {
        Err(StorageError::NotImplemented(BACKEND))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EntrySource, Language};

    #[tokio::test]
    async fn test_every_operation_is_not_implemented() {
        let store = CloudStore::new();
        let entry = SymptomEntry::new(EntrySource::Text, "cough", Language::English);

        assert!(matches!(store.save_entry(&entry).await, Err(StorageError::NotImplemented(_))));
        assert!(matches!(store.load_entries().await, Err(StorageError::NotImplemented(_))));
        assert!(matches!(store.delete_entry(entry.id).await, Err(StorageError::NotImplemented(_))));
        assert!(matches!(
            store.save_attachment(b"x", "a.png").await,
            Err(StorageError::NotImplemented(_))
        ));
        assert!(matches!(store.load_reports().await, Err(StorageError::NotImplemented(_))));
        assert!(matches!(
            store.load_setting("language").await,
            Err(StorageError::NotImplemented(_))
        ));
        assert!(matches!(store.clear_all().await, Err(StorageError::NotImplemented(_))));
    }
}
