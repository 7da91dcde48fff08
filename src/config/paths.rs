//! Canonical paths for symi data.
//!
//! Single source of truth - import this instead of hardcoding paths.
//!
//! ## Layout
//!
//! | Path | Owner | Purpose |
//! |------|-------|---------|
//! | `entries.json` | EntryStore | Symptom entries, newest first |
//! | `reports.json` | ReportStore | Doctor reports, newest first |
//! | `settings.json` | SettingsStore | Key/value settings |
//! | `attachments/` | BlobStore | One file per attachment |

use std::path::{Path, PathBuf};

pub const ENTRIES_FILE: &str = "entries.json";
pub const REPORTS_FILE: &str = "reports.json";
pub const SETTINGS_FILE: &str = "settings.json";
pub const ATTACHMENTS_DIR: &str = "attachments";

pub fn entries_file_in(root: &Path) -> PathBuf {
    root.join(ENTRIES_FILE)
}

pub fn reports_file_in(root: &Path) -> PathBuf {
    root.join(REPORTS_FILE)
}

pub fn settings_file_in(root: &Path) -> PathBuf {
    root.join(SETTINGS_FILE)
}

pub fn attachments_dir_in(root: &Path) -> PathBuf {
    root.join(ATTACHMENTS_DIR)
}
