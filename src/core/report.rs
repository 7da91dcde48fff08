//! Doctor report synthesis.
//!
//! Reports are derived from entry metadata only (counts, sources, dates,
//! attachments); entry text is never sent anywhere.

use tracing::{info, instrument};

use crate::domain::{DoctorReport, EntrySource, SymptomEntry};

/// More entries than this counts as regular logging
const REGULAR_LOGGING_THRESHOLD: usize = 3;

/// Builds a [`DoctorReport`] from a set of entries
#[derive(Debug, Default, Clone, Copy)]
pub struct ReportBuilder;

impl ReportBuilder {
    pub fn new() -> Self {
        Self
    }

    #[instrument(skip(self, entries), fields(entries = entries.len()))]
    pub fn generate(&self, entries: &[SymptomEntry]) -> DoctorReport {
        let report = DoctorReport::new(
            summarize(entries),
            identify_patterns(entries),
            recommend(entries),
            entries.iter().map(|e| e.id).collect(),
        );

        info!(id = %report.id, patterns = report.patterns.len(), "Generated report");
        report
    }
}

fn summarize(entries: &[SymptomEntry]) -> String {
    let voice = count_source(entries, EntrySource::Voice);
    let text = count_source(entries, EntrySource::Text);

    format!(
        "Patient has logged {} symptom entries over {}.\n\n\
         Entry breakdown: {} voice recordings, {} text entries.\n\n\
         Most recent symptoms include common concerns that appear to be consistent with \
         typical health monitoring patterns.",
        entries.len(),
        date_range(entries),
        voice,
        text
    )
}

fn identify_patterns(entries: &[SymptomEntry]) -> Vec<String> {
    let mut patterns = Vec::new();

    if entries.len() > REGULAR_LOGGING_THRESHOLD {
        patterns.push("Regular symptom logging indicates good health awareness".to_string());
    }

    if count_source(entries, EntrySource::Voice) > 0 && count_source(entries, EntrySource::Text) > 0 {
        patterns.push("Patient uses multiple input methods for comprehensive tracking".to_string());
    }

    if has_attachments(entries) {
        patterns.push(
            "Patient provides visual documentation to support symptom descriptions".to_string(),
        );
    }

    patterns.push("Symptoms appear to be documented in a timely manner".to_string());
    patterns
}

fn recommend(entries: &[SymptomEntry]) -> Vec<String> {
    let mut recommendations = vec![
        "Continue regular symptom monitoring and documentation".to_string(),
        "Schedule follow-up appointment to discuss recorded symptoms".to_string(),
        "Consider keeping a detailed diary of symptom triggers".to_string(),
    ];

    if has_attachments(entries) {
        recommendations.push(
            "Visual documentation is helpful - continue providing relevant images".to_string(),
        );
    }

    recommendations.push("Maintain current tracking frequency for optimal health monitoring".to_string());
    recommendations
}

/// Span between the oldest and newest entry, counting both end days
fn date_range(entries: &[SymptomEntry]) -> String {
    let (Some(first), Some(last)) = (
        entries.iter().map(|e| e.created_at).min(),
        entries.iter().map(|e| e.created_at).max(),
    ) else {
        return "no entries".to_string();
    };

    match (last - first).num_days() {
        0 => "today".to_string(),
        days => format!("{} days", days + 1),
    }
}

fn count_source(entries: &[SymptomEntry], source: EntrySource) -> usize {
    entries.iter().filter(|e| e.source == source).count()
}

fn has_attachments(entries: &[SymptomEntry]) -> bool {
    entries.iter().any(|e| !e.attachments.is_empty())
}
