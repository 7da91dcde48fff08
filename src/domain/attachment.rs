//! File attachments referenced by symptom entries.
//!
//! An `Attachment` is a back-reference to a blob owned by the blob store;
//! dropping the value does not touch the file.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Extensions classified as images without looking at the content
pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "heic"];

/// A stored attachment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    /// Unique identifier, also the blob file stem
    pub id: Uuid,

    /// Name of the file as the user supplied it
    pub filename: String,

    /// Location of the blob (owned by the blob store)
    pub local_path: PathBuf,

    pub kind: AttachmentKind,

    pub created_at: DateTime<Utc>,

    /// Free-form metadata (the blob store records size and checksum)
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,

    /// Fields written by newer versions, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Attachment {
    /// Create an attachment record for a blob that has already been written
    pub fn new(id: Uuid, filename: String, local_path: PathBuf, kind: AttachmentKind) -> Self {
        Self {
            id,
            filename,
            local_path,
            kind,
            created_at: Utc::now(),
            metadata: BTreeMap::new(),
            extra: Map::new(),
        }
    }

    /// Add a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Lowercased extension of the original filename
    pub fn file_extension(&self) -> String {
        std::path::Path::new(&self.filename)
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    }

    pub fn is_image(&self) -> bool {
        self.kind == AttachmentKind::Image
    }
}

/// Broad content class of an attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    Image,
    Document,
}

impl AttachmentKind {
    /// Classify by extension, falling back to the content signature
    pub fn classify(extension: &str, bytes: &[u8]) -> Self {
        if IMAGE_EXTENSIONS.contains(&extension) || has_image_signature(bytes) {
            Self::Image
        } else {
            Self::Document
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Image => "Image",
            Self::Document => "Document",
        }
    }
}

/// PNG, JPEG, or HEIC magic bytes
fn has_image_signature(bytes: &[u8]) -> bool {
    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n";
    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF];

    if bytes.starts_with(PNG) || bytes.starts_with(JPEG) {
        return true;
    }

    // ISO-BMFF: size(4) "ftyp" brand(4)
    if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" {
        return matches!(&bytes[8..12], b"heic" | b"heix" | b"mif1" | b"msf1");
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_by_extension() {
        assert_eq!(AttachmentKind::classify("jpg", b""), AttachmentKind::Image);
        assert_eq!(AttachmentKind::classify("heic", b""), AttachmentKind::Image);
        assert_eq!(AttachmentKind::classify("pdf", b"%PDF-1.7"), AttachmentKind::Document);
    }

    #[test]
    fn test_classify_by_signature() {
        let png = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
        assert_eq!(AttachmentKind::classify("bin", png), AttachmentKind::Image);

        let heic = b"\0\0\0\x18ftypheic\0\0\0\0";
        assert_eq!(AttachmentKind::classify("", heic), AttachmentKind::Image);

        let mp4 = b"\0\0\0\x18ftypisom\0\0\0\0";
        assert_eq!(AttachmentKind::classify("", mp4), AttachmentKind::Document);
    }

    #[test]
    fn test_unknown_fields_round_trip() {
        let json = r#"{
            "id": "550e8400-e29b-41d4-a716-446655440000",
            "filename": "rash.png",
            "local_path": "/tmp/a.png",
            "kind": "image",
            "created_at": "2024-03-01T10:00:00Z",
            "metadata": {"size_bytes": "12"},
            "thumbnail": "t.png"
        }"#;

        let attachment: Attachment = serde_json::from_str(json).unwrap();
        assert_eq!(attachment.file_extension(), "png");
        assert_eq!(attachment.extra.get("thumbnail"), Some(&Value::from("t.png")));

        let back = serde_json::to_value(&attachment).unwrap();
        assert_eq!(back["thumbnail"], "t.png");
    }
}
