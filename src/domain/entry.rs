//! Symptom entries: the records the journal is made of.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::attachment::Attachment;
use super::language::Language;

/// One captured symptom observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymptomEntry {
    /// Unique identifier, fixed at creation
    pub id: Uuid,

    pub created_at: DateTime<Utc>,

    /// How the observation was captured
    pub source: EntrySource,

    /// The observation text (transcript or typed)
    pub raw_text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_summary: Option<String>,

    #[serde(default, deserialize_with = "Language::deserialize_or_default")]
    pub language: Language,

    #[serde(default)]
    pub attachments: Vec<Attachment>,

    /// Fields written by newer versions, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SymptomEntry {
    /// Create a new entry with a fresh id and the current timestamp
    pub fn new(source: EntrySource, raw_text: impl Into<String>, language: Language) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            source,
            raw_text: raw_text.into(),
            ai_summary: None,
            language,
            attachments: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Attach a summary; empty strings are treated as no summary
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        let summary = summary.into();
        self.ai_summary = if summary.is_empty() { None } else { Some(summary) };
        self
    }

    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    /// Case-insensitive match against the text and summary
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.raw_text.to_lowercase().contains(&query)
            || self
                .ai_summary
                .as_deref()
                .map(|s| s.to_lowercase().contains(&query))
                .unwrap_or(false)
    }
}

/// Capture channel of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrySource {
    Voice,
    Text,
}

impl EntrySource {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Voice => "Voice",
            Self::Text => "Text",
        }
    }
}

impl fmt::Display for EntrySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
