//! Domain types for the symptom journal.
//!
//! - Entries: captured observations with their attachments
//! - Reports: summaries derived from entries
//! - TranscriptionState: transient voice capture state

pub mod attachment;
pub mod entry;
pub mod language;
pub mod report;
pub mod transcription;

pub use attachment::{Attachment, AttachmentKind, IMAGE_EXTENSIONS};
pub use entry::{EntrySource, SymptomEntry};
pub use language::Language;
pub use report::{DoctorReport, REPORT_DISCLAIMER};
pub use transcription::TranscriptionState;
