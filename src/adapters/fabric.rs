//! Fabric adapter for summaries and translation.
//!
//! Runs fabric patterns as a subprocess: the input is piped to stdin and
//! the pattern output is read from stdout. The target language is passed
//! with `-g`.

use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::instrument;

use super::{Summarizer, SummaryError, TranslationError, Translator};
use crate::config::FabricSettings;
use crate::domain::Language;

/// Fabric adapter using subprocess mode
pub struct FabricAdapter {
    /// Path to the fabric binary (default: "fabric")
    binary_path: String,

    summary_pattern: String,

    translate_pattern: String,

    /// Per-call timeout
    timeout: Duration,
}

impl Default for FabricAdapter {
    fn default() -> Self {
        Self::from_settings(&FabricSettings::default())
    }
}

impl FabricAdapter {
    /// Create an adapter from resolved configuration
    ///
    /// Without an explicit binary, looks for fabric-ai first (Homebrew
    /// install), then falls back to fabric
    pub fn from_settings(settings: &FabricSettings) -> Self {
        let binary_path = settings.binary.clone().unwrap_or_else(detect_binary);

        Self {
            binary_path,
            summary_pattern: settings.summary_pattern.clone(),
            translate_pattern: settings.translate_pattern.clone(),
            timeout: settings.timeout,
        }
    }

    /// Create a Fabric adapter with a custom binary path
    pub fn with_binary_path(binary_path: impl Into<String>) -> Self {
        Self::from_settings(&FabricSettings {
            binary: Some(binary_path.into()),
            ..FabricSettings::default()
        })
    }

    /// Run `fabric -p <pattern> -g <language>` with `input` on stdin
    #[instrument(skip(self, input), fields(bytes = input.len()))]
    async fn run_pattern(&self, pattern: &str, language: Language, input: &str) -> Result<String> {
        let mut child = Command::new(&self.binary_path)
            .args(["-p", pattern, "-g", language.code()])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to spawn fabric process for pattern '{}'", pattern))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input.as_bytes())
                .await
                .context("Failed to write to fabric stdin")?;
            // Drop stdin to signal EOF
        }

        let output = timeout(self.timeout, child.wait_with_output())
            .await
            .with_context(|| {
                format!("Fabric pattern '{}' timed out after {:?}", pattern, self.timeout)
            })?
            .with_context(|| format!("Failed to wait for fabric process for pattern '{}'", pattern))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let exit_code = output.status.code().unwrap_or(-1);
            anyhow::bail!(
                "Fabric pattern '{}' failed with exit code {}: {}",
                pattern,
                exit_code,
                stderr.trim()
            );
        }

        let stdout = String::from_utf8(output.stdout).context("Fabric output is not valid UTF-8")?;
        Ok(stdout.trim().to_string())
    }
}

fn detect_binary() -> String {
    if std::process::Command::new("fabric-ai")
        .arg("--help")
        .output()
        .is_ok()
    {
        "fabric-ai".to_string()
    } else {
        "fabric".to_string()
    }
}

#[async_trait]
impl Summarizer for FabricAdapter {
    fn name(&self) -> &str {
        "fabric"
    }

    async fn summarize(&self, text: &str, language: Language) -> Result<String, SummaryError> {
        if text.trim().is_empty() {
            return Err(SummaryError::EmptyInput);
        }

        self.run_pattern(&self.summary_pattern, language, text)
            .await
            .map_err(|e| SummaryError::Backend(format!("{:#}", e)))
    }
}

#[async_trait]
impl Translator for FabricAdapter {
    fn name(&self) -> &str {
        "fabric"
    }

    async fn translate(&self, text: &str, target: Language) -> Result<String, TranslationError> {
        self.run_pattern(&self.translate_pattern, target, text)
            .await
            .map_err(|e| TranslationError::Backend(format!("{:#}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_binary_path() {
        let adapter = FabricAdapter::with_binary_path("/custom/path/fabric");
        assert_eq!(adapter.binary_path, "/custom/path/fabric");
        assert_eq!(adapter.summary_pattern, "summarize");
        assert_eq!(adapter.translate_pattern, "translate");
    }

    #[test]
    fn test_from_settings() {
        let adapter = FabricAdapter::from_settings(&FabricSettings {
            binary: Some("fabric".to_string()),
            summary_pattern: "summarize_medical".to_string(),
            translate_pattern: "translate".to_string(),
            timeout: Duration::from_secs(5),
        });
        assert_eq!(Summarizer::name(&adapter), "fabric");
        assert_eq!(adapter.summary_pattern, "summarize_medical");
        assert_eq!(adapter.timeout, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_missing_binary_surfaces_backend_error() {
        let adapter = FabricAdapter::with_binary_path("/nonexistent/fabric");

        let result = adapter.summarize("cough", Language::English).await;
        assert!(matches!(result, Err(SummaryError::Backend(_))));

        let result = adapter.translate("cough", Language::Spanish).await;
        assert!(matches!(result, Err(TranslationError::Backend(_))));
    }
}
