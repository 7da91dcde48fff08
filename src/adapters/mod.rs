//! Collaborator interfaces for external systems.
//!
//! The composition pipeline talks to transcription, summarization,
//! translation, and audio capture only through these traits, so a real
//! backend can replace the mocks without touching the core.

pub mod fabric;
pub mod mock;
pub mod recorder;
pub mod whisper;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::Language;

pub use fabric::FabricAdapter;
pub use mock::{MockSummarizer, MockTranscriber, MockTranslator};
pub use recorder::FileRecorder;
pub use whisper::WhisperTranscriber;

/// Errors from a transcription backend
#[derive(Debug, Error)]
pub enum TranscriptionError {
    #[error("No audio was captured")]
    EmptyAudio,

    #[error("Transcription failed: {0}")]
    Backend(String),
}

/// Errors from a summary backend
#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("Nothing to summarize")]
    EmptyInput,

    #[error("Summary generation failed: {0}")]
    Backend(String),
}

/// Errors from a translation backend
#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("Translation failed: {0}")]
    Backend(String),
}

/// Errors from audio capture
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Already recording")]
    AlreadyRecording,

    #[error("Not recording")]
    NotRecording,

    #[error("Failed to read recording: {0}")]
    Read(#[from] std::io::Error),
}

/// Speech-to-text backend
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Human-readable backend name
    fn name(&self) -> &str;

    async fn transcribe(&self, audio: &[u8]) -> Result<String, TranscriptionError>;
}

/// Produces a short clinical summary of an observation
#[async_trait]
pub trait Summarizer: Send + Sync {
    fn name(&self) -> &str;

    async fn summarize(&self, text: &str, language: Language) -> Result<String, SummaryError>;
}

/// Translates text into a target language
#[async_trait]
pub trait Translator: Send + Sync {
    fn name(&self) -> &str;

    async fn translate(&self, text: &str, target: Language) -> Result<String, TranslationError>;
}

/// Platform audio capture.
///
/// `stop` ends the capture immediately and returns the recorded bytes.
#[async_trait]
pub trait AudioRecorder: Send {
    async fn start(&mut self) -> Result<(), CaptureError>;

    async fn stop(&mut self) -> Result<Vec<u8>, CaptureError>;

    /// Abort an in-progress capture, discarding anything recorded
    async fn discard(&mut self) {
        let _ = self.stop().await;
    }
}
