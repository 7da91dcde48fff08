//! Whisper transcription backend.
//!
//! Shells out to a local whisper binary. The captured audio is written to a
//! temp directory, transcribed to JSON, and parsed back.

use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, instrument};

use super::{Transcriber, TranscriptionError};
use crate::config::WhisperSettings;
use crate::domain::Language;

/// Whisper output JSON structure
#[derive(Debug, Deserialize)]
struct WhisperOutput {
    text: String,
    #[serde(default)]
    language: String,
    #[serde(default)]
    segments: Vec<WhisperSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    #[serde(default)]
    end: f64,
}

/// Transcriber backed by the whisper CLI
pub struct WhisperTranscriber {
    /// Path to the whisper binary
    binary_path: String,

    /// Model name passed to `--model`
    model: String,

    /// Spoken language hint; whisper auto-detects when unset
    language: Option<Language>,
}

impl WhisperTranscriber {
    pub fn new(binary_path: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            binary_path: binary_path.into(),
            model: model.into(),
            language: None,
        }
    }

    /// Create from resolved configuration
    pub fn from_settings(settings: &WhisperSettings) -> Self {
        Self::new(settings.binary.clone(), settings.model.clone())
    }

    /// Pin the spoken language instead of auto-detecting
    pub fn with_language(mut self, language: Language) -> Self {
        self.language = Some(language);
        self
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    fn name(&self) -> &str {
        "whisper"
    }

    #[instrument(skip(self, audio), fields(bytes = audio.len(), model = %self.model))]
    async fn transcribe(&self, audio: &[u8]) -> Result<String, TranscriptionError> {
        if audio.is_empty() {
            return Err(TranscriptionError::EmptyAudio);
        }

        let temp_dir = tempfile::tempdir()
            .map_err(|e| TranscriptionError::Backend(format!("Failed to create temp dir: {}", e)))?;
        let audio_path = temp_dir.path().join("recording.m4a");

        tokio::fs::write(&audio_path, audio)
            .await
            .map_err(|e| TranscriptionError::Backend(format!("Failed to stage audio: {}", e)))?;

        let mut command = Command::new(&self.binary_path);
        command
            .arg(&audio_path)
            .arg("--model")
            .arg(&self.model)
            .arg("--output_dir")
            .arg(temp_dir.path())
            .arg("--output_format")
            .arg("json");
        if let Some(language) = self.language {
            command.arg("--language").arg(language.code());
        }

        let output = command
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| TranscriptionError::Backend(format!("Failed to run whisper: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TranscriptionError::Backend(format!(
                "whisper exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let json_path = temp_dir.path().join("recording.json");
        let json_content = tokio::fs::read_to_string(&json_path)
            .await
            .map_err(|e| TranscriptionError::Backend(format!("Failed to read whisper output: {}", e)))?;

        let text = parse_output(&json_content)?;
        Ok(text)
    }
}

/// Extract the transcript from whisper's JSON output
fn parse_output(json: &str) -> Result<String, TranscriptionError> {
    let whisper: WhisperOutput = serde_json::from_str(json)
        .map_err(|e| TranscriptionError::Backend(format!("Failed to parse whisper JSON: {}", e)))?;

    let duration = whisper.segments.last().map(|s| s.end).unwrap_or(0.0);
    debug!(language = %whisper.language, duration_seconds = duration, "Whisper finished");

    Ok(whisper.text.trim().to_string())
}
