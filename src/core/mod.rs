//! Core logic.
//!
//! This module contains:
//! - Composition: the actor driving one entry from capture to save
//! - ReportBuilder: doctor reports derived from stored entries

pub mod composition;
pub mod report;

pub use composition::{
    Composition, CompositionError, CompositionHandle, CompositionOptions, CompositionServices,
    CompositionSnapshot, Phase, ProgressSettings,
};
pub use report::ReportBuilder;
