//! Canned collaborators used until real backends are configured.

use std::time::Duration;

use async_trait::async_trait;

use super::{
    Summarizer, SummaryError, Transcriber, TranscriptionError, TranslationError, Translator,
};
use crate::domain::Language;

/// Returns a fixed transcript after a short delay
pub struct MockTranscriber {
    text: String,
    delay: Duration,
}

impl Default for MockTranscriber {
    fn default() -> Self {
        Self {
            text: "Mock transcription text".to_string(),
            delay: Duration::from_millis(600),
        }
    }
}

impl MockTranscriber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `text` for every recording
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl Transcriber for MockTranscriber {
    fn name(&self) -> &str {
        "mock"
    }

    async fn transcribe(&self, audio: &[u8]) -> Result<String, TranscriptionError> {
        if audio.is_empty() {
            return Err(TranscriptionError::EmptyAudio);
        }

        tokio::time::sleep(self.delay).await;
        Ok(self.text.clone())
    }
}

/// Builds a templated summary quoting the start of the text
pub struct MockSummarizer {
    delay: Duration,
}

impl Default for MockSummarizer {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(1),
        }
    }
}

impl MockSummarizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl Summarizer for MockSummarizer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn summarize(&self, text: &str, _language: Language) -> Result<String, SummaryError> {
        if text.trim().is_empty() {
            return Err(SummaryError::EmptyInput);
        }

        tokio::time::sleep(self.delay).await;

        let excerpt: String = text.chars().take(50).collect();
        Ok(format!(
            "Based on the symptoms described, this appears to be a common condition that may \
             require attention.\n\n\
             Key observations:\n\
             • {}...\n\
             • Duration and severity should be monitored\n\
             • Consider environmental factors\n\n\
             Recommendation: Track symptoms and consult healthcare provider if symptoms persist \
             or worsen.",
            excerpt
        ))
    }
}

/// Tags the text with the target language name
pub struct MockTranslator {
    delay: Duration,
}

impl Default for MockTranslator {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(300),
        }
    }
}

impl MockTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl Translator for MockTranslator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn translate(&self, text: &str, target: Language) -> Result<String, TranslationError> {
        tokio::time::sleep(self.delay).await;
        Ok(format!("{} (translated to {})", text, target.display_name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_transcriber() {
        let transcriber = MockTranscriber::new()
            .with_text("cough and mild fever")
            .with_delay(Duration::ZERO);

        assert_eq!(transcriber.transcribe(b"audio").await.unwrap(), "cough and mild fever");
        assert!(matches!(
            transcriber.transcribe(b"").await,
            Err(TranscriptionError::EmptyAudio)
        ));
    }

    #[tokio::test]
    async fn test_mock_summarizer_quotes_excerpt() {
        let summarizer = MockSummarizer::new().with_delay(Duration::ZERO);

        let summary = summarizer
            .summarize("persistent dry cough at night", Language::English)
            .await
            .unwrap();
        assert!(summary.contains("• persistent dry cough at night..."));
    }

    #[tokio::test]
    async fn test_mock_translator() {
        let translator = MockTranslator::new().with_delay(Duration::ZERO);

        let out = translator.translate("fever", Language::French).await.unwrap();
        assert_eq!(out, "fever (translated to Français)");
    }
}
