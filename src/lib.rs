//! symi - Symptom journal
//!
//! Captures health-symptom observations by voice or text, optionally
//! enriches them with an AI summary, a translation, and file attachments,
//! and persists them locally so they can be aggregated into a report for
//! a doctor visit.
//!
//! # Architecture
//!
//! - Each in-progress entry is a [`Composition`] actor; collaborator results
//!   are applied to its state one at a time on the actor task
//! - Persistence is whole-collection JSON files with serialized
//!   read-modify-write, plus one file per attachment blob
//! - External systems (transcription, summary, translation, capture) sit
//!   behind traits in `adapters`
//!
//! # Modules
//!
//! - `adapters`: Collaborator traits and backends (mock, whisper, fabric)
//! - `core`: Composition pipeline and report builder
//! - `domain`: Data structures (SymptomEntry, Attachment, DoctorReport)
//! - `storage`: Local JSON persistence
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Save a text entry with a summary
//! symi new --text "cough and mild fever" --summarize
//!
//! # Transcribe a voice memo
//! symi new --audio memo.m4a --attach rash.jpg
//!
//! # Prepare a report for the doctor
//! symi report --save
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod storage;

// Re-export main types at crate root for convenience
pub use crate::core::{Composition, CompositionHandle, ReportBuilder};
pub use domain::{Attachment, DoctorReport, EntrySource, Language, SymptomEntry};
pub use storage::{LocalStore, Storage, StorageError};
