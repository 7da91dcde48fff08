//! Local Store Integration Tests
//!
//! Tests for round-tripping records through the Storage trait, cascade
//! deletes, and per-collection serialization under concurrent writers.

use std::sync::Arc;

use serde_json::json;
use symi::domain::{DoctorReport, EntrySource, Language, SymptomEntry};
use symi::storage::{LocalStore, Storage, StorageError};
use tempfile::TempDir;
use uuid::Uuid;

async fn open_store() -> (Arc<LocalStore>, TempDir) {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(LocalStore::open(temp.path()).await.unwrap());
    (store, temp)
}

#[tokio::test]
async fn test_entry_round_trip() {
    let (store, _temp) = open_store().await;

    let attachment = store.save_attachment(b"\x89PNG\r\n\x1a\nrash", "rash.png").await.unwrap();
    let entry = SymptomEntry::new(EntrySource::Voice, "cough and mild fever", Language::Spanish)
        .with_summary("Respiratory symptoms")
        .with_attachments(vec![attachment.clone()]);

    store.save_entry(&entry).await.unwrap();

    let loaded = store.load_entries().await.unwrap();
    assert_eq!(loaded, vec![entry]);
    assert_eq!(store.load_attachment(&attachment).await.unwrap(), b"\x89PNG\r\n\x1a\nrash");
}

#[tokio::test]
async fn test_many_entries_round_trip_newest_first() {
    let (store, _temp) = open_store().await;
    let now = chrono::Utc::now();

    let photo = store.save_attachment(b"\xff\xd8\xffrash", "arm.JPG").await.unwrap();
    let scan = store.save_attachment(b"%PDF-1.7", "bloodwork.pdf").await.unwrap();

    let mut first = SymptomEntry::new(EntrySource::Text, "sore throat", Language::English);
    first.created_at = now - chrono::Duration::days(3);

    let mut second = SymptomEntry::new(EntrySource::Voice, "dolor de cabeza", Language::Spanish)
        .with_summary("Headache");
    second.created_at = now - chrono::Duration::hours(30);

    let mut third = SymptomEntry::new(EntrySource::Text, "rash on forearm", Language::French)
        .with_summary("Skin irritation")
        .with_attachments(vec![photo, scan]);
    third.created_at = now - chrono::Duration::minutes(5);

    let mut fourth = SymptomEntry::new(EntrySource::Voice, "咳嗽", Language::Chinese);
    fourth.created_at = now;

    // Saved out of chronological order
    for entry in [&third, &first, &fourth, &second] {
        store.save_entry(entry).await.unwrap();
    }

    let loaded = store.load_entries().await.unwrap();
    assert_eq!(loaded, vec![fourth, third, second, first]);
}

#[tokio::test]
async fn test_same_id_save_is_last_write_wins() {
    let (store, _temp) = open_store().await;

    let mut entry = SymptomEntry::new(EntrySource::Text, "headache", Language::English);
    store.save_entry(&entry).await.unwrap();

    entry.raw_text = "headache, worse in the evening".to_string();
    store.save_entry(&entry).await.unwrap();

    let loaded = store.load_entries().await.unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].raw_text, "headache, worse in the evening");
}

#[tokio::test]
async fn test_unknown_fields_survive_rewrite() {
    let (store, temp) = open_store().await;

    let id = Uuid::new_v4();
    let file = json!([{
        "id": id,
        "created_at": "2024-03-01T08:00:00Z",
        "source": "text",
        "raw_text": "dizzy after standing",
        "language": "en",
        "attachments": [],
        "mood": "tired"
    }]);
    std::fs::write(temp.path().join("entries.json"), file.to_string()).unwrap();

    store
        .save_entry(&SymptomEntry::new(EntrySource::Text, "new entry", Language::English))
        .await
        .unwrap();

    let raw: serde_json::Value =
        serde_json::from_slice(&std::fs::read(temp.path().join("entries.json")).unwrap()).unwrap();
    let old = raw
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["id"] == json!(id))
        .unwrap();
    assert_eq!(old["mood"], "tired");
}

#[tokio::test]
async fn test_unknown_language_does_not_break_collection() {
    let (store, temp) = open_store().await;

    let id = Uuid::new_v4();
    let file = json!([{
        "id": id,
        "created_at": "2024-03-01T08:00:00Z",
        "source": "voice",
        "raw_text": "Kopfschmerzen",
        "language": "de",
        "attachments": []
    }]);
    std::fs::write(temp.path().join("entries.json"), file.to_string()).unwrap();

    let loaded = store.load_entries().await.unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].id, id);
    assert_eq!(loaded[0].language, Language::English);

    store
        .save_entry(&SymptomEntry::new(EntrySource::Text, "still writable", Language::English))
        .await
        .unwrap();
    assert_eq!(store.load_entries().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_delete_cascades_to_blobs() {
    let (store, _temp) = open_store().await;

    let mut attachments = Vec::new();
    for i in 0..3 {
        let name = format!("scan{}.pdf", i);
        attachments.push(store.save_attachment(b"%PDF-1.7", &name).await.unwrap());
    }
    let entry = SymptomEntry::new(EntrySource::Text, "lab results", Language::English)
        .with_attachments(attachments.clone());
    store.save_entry(&entry).await.unwrap();

    store.delete_entry(entry.id).await.unwrap();

    assert!(store.load_entries().await.unwrap().is_empty());
    for attachment in &attachments {
        let result = store.load_attachment(attachment).await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }
}

#[tokio::test]
async fn test_delete_unknown_id_is_noop() {
    let (store, temp) = open_store().await;

    let entry = SymptomEntry::new(EntrySource::Text, "nausea", Language::English);
    store.save_entry(&entry).await.unwrap();
    let before = std::fs::read(temp.path().join("entries.json")).unwrap();

    store.delete_entry(Uuid::new_v4()).await.unwrap();

    assert_eq!(std::fs::read(temp.path().join("entries.json")).unwrap(), before);
}

#[tokio::test]
async fn test_corrupt_collection_degrades_to_empty() {
    let (store, temp) = open_store().await;
    std::fs::write(temp.path().join("reports.json"), b"[{\"id\": ").unwrap();

    assert!(store.load_reports().await.unwrap().is_empty());

    let report = DoctorReport::new("summary".into(), vec![], vec![], vec![]);
    let result = store.save_report(&report).await;
    assert!(matches!(result, Err(StorageError::Decoding { .. })));
}

#[tokio::test]
async fn test_concurrent_saves_of_different_ids_all_survive() {
    let (store, _temp) = open_store().await;

    let mut tasks = Vec::new();
    for i in 0..25 {
        let store = Arc::clone(&store);
        tasks.push(tokio::spawn(async move {
            let entry = SymptomEntry::new(EntrySource::Text, format!("entry {}", i), Language::English);
            store.save_entry(&entry).await.unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let entries = store.load_entries().await.unwrap();
    assert_eq!(entries.len(), 25);
    assert!(entries.windows(2).all(|w| w[0].created_at >= w[1].created_at));
}

#[tokio::test]
async fn test_stores_opened_on_one_directory_do_not_lose_writes() {
    let temp = TempDir::new().unwrap();
    let stores = [
        Arc::new(LocalStore::open(temp.path()).await.unwrap()),
        Arc::new(LocalStore::open(temp.path()).await.unwrap()),
    ];

    let mut tasks = Vec::new();
    for i in 0..40 {
        let store = Arc::clone(&stores[i % 2]);
        tasks.push(tokio::spawn(async move {
            let entry = SymptomEntry::new(EntrySource::Text, format!("entry {}", i), Language::English);
            store.save_entry(&entry).await.unwrap();
            entry.id
        }));
    }
    let mut saved = Vec::new();
    for task in tasks {
        saved.push(task.await.unwrap());
    }

    for store in &stores {
        let entries = store.load_entries().await.unwrap();
        assert_eq!(entries.len(), 40);
        assert!(saved.iter().all(|id| entries.iter().any(|e| e.id == *id)));
    }
}

#[tokio::test]
async fn test_concurrent_settings_keep_every_key() {
    let (store, _temp) = open_store().await;

    let mut tasks = Vec::new();
    for i in 0..10 {
        let store = Arc::clone(&store);
        tasks.push(tokio::spawn(async move {
            store.save_setting(&format!("key{}", i), json!(i)).await.unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    for i in 0..10 {
        let value = store.load_setting(&format!("key{}", i)).await.unwrap();
        assert_eq!(value, Some(json!(i)));
    }
    assert_eq!(store.load_setting("missing").await.unwrap(), None);
}

#[tokio::test]
async fn test_reports_round_trip_newest_first() {
    let (store, _temp) = open_store().await;

    let mut older = DoctorReport::new("older".into(), vec![], vec![], vec![]);
    older.generated_at -= chrono::Duration::days(1);
    let newer = DoctorReport::new("newer".into(), vec!["p".into()], vec!["r".into()], vec![Uuid::new_v4()]);

    store.save_report(&older).await.unwrap();
    store.save_report(&newer).await.unwrap();

    let reports = store.load_reports().await.unwrap();
    assert_eq!(reports, vec![newer, older]);
}
