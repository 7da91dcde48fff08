//! Audio capture backed by a pre-recorded file.
//!
//! Used by the CLI, where the "recording" is an audio file the user already
//! has; `stop` reads the file as the captured audio.

use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use tracing::debug;

use super::{AudioRecorder, CaptureError};

/// Recorder that yields the contents of an existing audio file
pub struct FileRecorder {
    path: PathBuf,

    /// When the current capture began
    started_at: Option<Instant>,
}

impl FileRecorder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            started_at: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_recording(&self) -> bool {
        self.started_at.is_some()
    }
}

#[async_trait]
impl AudioRecorder for FileRecorder {
    async fn start(&mut self) -> Result<(), CaptureError> {
        if self.started_at.is_some() {
            return Err(CaptureError::AlreadyRecording);
        }

        self.started_at = Some(Instant::now());
        debug!(path = %self.path.display(), "Recording started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<Vec<u8>, CaptureError> {
        let started_at = self.started_at.take().ok_or(CaptureError::NotRecording)?;
        debug!(elapsed_ms = started_at.elapsed().as_millis() as u64, "Recording stopped");

        Ok(tokio::fs::read(&self.path).await?)
    }

    async fn discard(&mut self) {
        self.started_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_start_stop_reads_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("memo.m4a");
        tokio::fs::write(&path, b"fake audio").await.unwrap();

        let mut recorder = FileRecorder::new(&path);
        recorder.start().await.unwrap();
        assert!(recorder.is_recording());
        assert!(matches!(recorder.start().await, Err(CaptureError::AlreadyRecording)));

        let audio = recorder.stop().await.unwrap();
        assert_eq!(audio, b"fake audio");
        assert!(!recorder.is_recording());
    }

    #[tokio::test]
    async fn test_stop_without_start() {
        let mut recorder = FileRecorder::new("/nonexistent.m4a");
        assert!(matches!(recorder.stop().await, Err(CaptureError::NotRecording)));
    }

    #[tokio::test]
    async fn test_missing_file_is_read_error() {
        let temp = TempDir::new().unwrap();
        let mut recorder = FileRecorder::new(temp.path().join("missing.m4a"));

        recorder.start().await.unwrap();
        assert!(matches!(recorder.stop().await, Err(CaptureError::Read(_))));
    }
}
