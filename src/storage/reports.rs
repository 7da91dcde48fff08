//! Doctor report collection (`reports.json`).

use std::path::PathBuf;

use tracing::{info, instrument};
use uuid::Uuid;

use super::{upsert, CollectionStore, StorageError};
use crate::domain::DoctorReport;

/// Typed store for generated reports, newest first
pub struct ReportStore {
    collection: CollectionStore<DoctorReport>,
}

impl ReportStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            collection: CollectionStore::new(path),
        }
    }

    /// Insert or replace a report by id
    #[instrument(skip(self, report), fields(report_id = %report.id))]
    pub async fn save(&self, report: &DoctorReport) -> Result<(), StorageError> {
        let report = report.clone();
        self.collection
            .update(move |reports| {
                upsert(reports, report);
                Some(())
            })
            .await?;

        info!("Saved report");
        Ok(())
    }

    /// All reports, newest first
    pub async fn load_all(&self) -> Vec<DoctorReport> {
        self.collection.load_all().await
    }

    pub async fn get(&self, id: Uuid) -> Option<DoctorReport> {
        self.load_all().await.into_iter().find(|report| report.id == id)
    }

    pub async fn clear(&self) -> Result<(), StorageError> {
        self.collection.clear().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    fn report_at(summary: &str, hours_ago: i64) -> DoctorReport {
        let mut report = DoctorReport::new(summary.to_string(), vec![], vec![], vec![]);
        report.generated_at = Utc::now() - Duration::hours(hours_ago);
        report
    }

    #[tokio::test]
    async fn test_reports_sorted_newest_first() {
        let temp = TempDir::new().unwrap();
        let store = ReportStore::new(temp.path().join("reports.json"));

        store.save(&report_at("last week", 24 * 7)).await.unwrap();
        store.save(&report_at("today", 1)).await.unwrap();
        store.save(&report_at("yesterday", 24)).await.unwrap();

        let summaries: Vec<_> = store
            .load_all()
            .await
            .into_iter()
            .map(|r| r.summary)
            .collect();
        assert_eq!(summaries, vec!["today", "yesterday", "last week"]);
    }

    #[tokio::test]
    async fn test_get_report() {
        let temp = TempDir::new().unwrap();
        let store = ReportStore::new(temp.path().join("reports.json"));
        let report = report_at("only", 0);
        store.save(&report).await.unwrap();

        assert_eq!(store.get(report.id).await, Some(report));
        assert!(store.get(Uuid::new_v4()).await.is_none());
    }
}
