//! Symptom entry collection (`entries.json`).

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{upsert, BlobStore, CollectionStore, StorageError};
use crate::domain::SymptomEntry;

/// Typed store for symptom entries, newest first
pub struct EntryStore {
    collection: CollectionStore<SymptomEntry>,

    /// Blob store that owns the entries' attachment files
    blobs: Arc<BlobStore>,
}

impl EntryStore {
    pub fn new(path: impl Into<PathBuf>, blobs: Arc<BlobStore>) -> Self {
        Self {
            collection: CollectionStore::new(path),
            blobs,
        }
    }

    /// Insert or replace an entry by id
    #[instrument(skip(self, entry), fields(entry_id = %entry.id))]
    pub async fn save(&self, entry: &SymptomEntry) -> Result<(), StorageError> {
        if entry.raw_text.trim().is_empty() {
            return Err(StorageError::EmptyEntryText);
        }

        let entry = entry.clone();
        self.collection
            .update(move |entries| {
                upsert(entries, entry);
                Some(())
            })
            .await?;

        info!("Saved entry");
        Ok(())
    }

    /// All entries, newest first
    pub async fn load_all(&self) -> Vec<SymptomEntry> {
        self.collection.load_all().await
    }

    /// Get an entry by ID
    pub async fn get(&self, id: Uuid) -> Option<SymptomEntry> {
        self.load_all().await.into_iter().find(|entry| entry.id == id)
    }

    /// Entries whose text or summary contains `query` (case-insensitive)
    pub async fn search(&self, query: &str) -> Vec<SymptomEntry> {
        let entries = self.load_all().await;
        if query.trim().is_empty() {
            return entries;
        }

        entries.into_iter().filter(|entry| entry.matches(query)).collect()
    }

    /// Delete an entry and its attachment blobs.
    ///
    /// Returns `false` if no entry had that id. The entry is removed from the
    /// collection first; blob deletion afterwards is best-effort, so a failed
    /// collection write leaves every blob of the still-stored entry in place.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<bool, StorageError> {
        let removed = self
            .collection
            .update(|entries| {
                let index = entries.iter().position(|entry| entry.id == id)?;
                Some(entries.remove(index))
            })
            .await?;

        let Some(entry) = removed else {
            return Ok(false);
        };

        for attachment in &entry.attachments {
            if let Err(e) = self.blobs.delete(attachment).await {
                warn!(attachment_id = %attachment.id, error = %e, "Failed to delete attachment blob");
            }
        }

        info!(attachments = entry.attachments.len(), "Deleted entry");
        Ok(true)
    }

    pub async fn clear(&self) -> Result<(), StorageError> {
        self.collection.clear().await
    }
}
