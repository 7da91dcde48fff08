//! Reports synthesized from stored entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Text appended to every report
pub const REPORT_DISCLAIMER: &str = "This report is AI-generated based on symptom entries and \
should not replace professional medical advice. Please consult with a healthcare provider for \
proper diagnosis and treatment.";

/// A report prepared for a clinician
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctorReport {
    pub id: Uuid,

    pub generated_at: DateTime<Utc>,

    pub summary: String,

    pub patterns: Vec<String>,

    pub recommendations: Vec<String>,

    pub disclaimer: String,

    /// Entries the report was derived from (audit trail only)
    pub entry_ids: Vec<Uuid>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DoctorReport {
    /// Create a report with a fresh id and the standard disclaimer
    pub fn new(
        summary: String,
        patterns: Vec<String>,
        recommendations: Vec<String>,
        entry_ids: Vec<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            generated_at: Utc::now(),
            summary,
            patterns,
            recommendations,
            disclaimer: REPORT_DISCLAIMER.to_string(),
            entry_ids,
            extra: Map::new(),
        }
    }

    /// Render as Markdown for sharing
    pub fn to_markdown(&self) -> String {
        let mut out = String::from("# Symptom Report\n\n");
        out.push_str(&format!(
            "**Generated:** {}\n\n",
            self.generated_at.format("%b %-d, %Y %H:%M UTC")
        ));

        out.push_str("## Summary\n");
        out.push_str(&self.summary);
        out.push_str("\n\n");

        out.push_str("## Patterns Identified\n");
        for (i, pattern) in self.patterns.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", i + 1, pattern));
        }
        out.push('\n');

        out.push_str("## Recommendations\n");
        for (i, rec) in self.recommendations.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", i + 1, rec));
        }
        out.push('\n');

        out.push_str("## Disclaimer\n");
        out.push_str(&self.disclaimer);
        out.push('\n');

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_markdown_sections() {
        let report = DoctorReport::new(
            "Two entries today.".to_string(),
            vec!["Pattern A".to_string()],
            vec!["Rec A".to_string(), "Rec B".to_string()],
            vec![Uuid::new_v4()],
        );

        let md = report.to_markdown();
        assert!(md.starts_with("# Symptom Report"));
        assert!(md.contains("## Patterns Identified\n1. Pattern A\n"));
        assert!(md.contains("2. Rec B\n"));
        assert!(md.trim_end().ends_with(REPORT_DISCLAIMER));
    }
}
