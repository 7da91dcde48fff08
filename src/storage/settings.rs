//! Flat key/value settings bag (`settings.json`).
//!
//! Keys are independent; `set` merges into the stored map under the file
//! lock, so concurrent writes to different keys never clobber each other.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{JsonStore, StorageError};

/// Well-known setting keys
pub mod keys {
    /// Default language for new entries
    pub const LANGUAGE: &str = "language";

    /// Whether the cloud backend is selected
    pub const CLOUD_STORAGE_ENABLED: &str = "cloud_storage_enabled";
}

/// Typed facade over the settings file
pub struct SettingsStore {
    store: JsonStore<BTreeMap<String, Value>>,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            store: JsonStore::new(path),
        }
    }

    /// Store a raw JSON value, keeping every other key
    pub async fn set_raw(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let key = key.to_string();
        self.store
            .update(move |settings| {
                settings.insert(key, value);
                Some(())
            })
            .await?;
        Ok(())
    }

    /// Store any serializable value
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let value = serde_json::to_value(value).map_err(|source| StorageError::Encoding {
            what: format!("setting '{}'", key),
            source,
        })?;
        self.set_raw(key, value).await
    }

    /// Raw value for `key`, if present
    pub async fn get_raw(&self, key: &str) -> Option<Value> {
        self.store.load_all().await.remove(key)
    }

    /// Typed value for `key`; a value of the wrong shape reads as absent
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get_raw(key).await?;

        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(e) => {
                warn!(key, error = %e, "Setting has unexpected type, ignoring");
                None
            }
        }
    }

    /// Remove a key; returns whether it existed
    pub async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let removed = self
            .store
            .update(|settings| settings.remove(key).map(|_| ()))
            .await?;
        debug!(key, removed = removed.is_some(), "Removed setting");
        Ok(removed.is_some())
    }

    /// Every stored key and value
    pub async fn all(&self) -> BTreeMap<String, Value> {
        self.store.load_all().await
    }

    pub async fn clear(&self) -> Result<(), StorageError> {
        self.store.clear().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Language;
    use tempfile::TempDir;

    fn create_test_store() -> (SettingsStore, TempDir) {
        let temp = TempDir::new().unwrap();
        let store = SettingsStore::new(temp.path().join("settings.json"));
        (store, temp)
    }

    #[tokio::test]
    async fn test_set_merges_keys() {
        let (store, _temp) = create_test_store();

        store.set("a", &1).await.unwrap();
        store.set("b", &2).await.unwrap();

        assert_eq!(store.get::<i32>("a").await, Some(1));
        assert_eq!(store.get::<i32>("b").await, Some(2));
    }

    #[tokio::test]
    async fn test_missing_key_is_absent() {
        let (store, _temp) = create_test_store();
        assert_eq!(store.get::<bool>("nope").await, None);
    }

    #[tokio::test]
    async fn test_typed_values() {
        let (store, _temp) = create_test_store();

        store.set(keys::LANGUAGE, &Language::Spanish).await.unwrap();
        store.set(keys::CLOUD_STORAGE_ENABLED, &true).await.unwrap();

        assert_eq!(store.get(keys::LANGUAGE).await, Some(Language::Spanish));
        assert_eq!(store.get(keys::CLOUD_STORAGE_ENABLED).await, Some(true));

        // Wrong type reads as absent
        assert_eq!(store.get::<u64>(keys::LANGUAGE).await, None);
    }

    #[tokio::test]
    async fn test_remove() {
        let (store, _temp) = create_test_store();
        store.set("k", &"v").await.unwrap();

        assert!(store.remove("k").await.unwrap());
        assert!(!store.remove("k").await.unwrap());
        assert!(store.all().await.is_empty());
    }
}
