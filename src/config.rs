//! Configuration for symi.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (SYMI_HOME, SYMI_BACKEND, WHISPER_PATH)
//! 2. Config file (.symi/config.yaml)
//! 3. Defaults (~/.symi, mock backends)
//!
//! Config file discovery:
//! - Searches current directory and parents for .symi/config.yaml
//! - Paths in config file are relative to the .symi/ directory

pub mod paths;

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::composition::ProgressSettings;
use crate::domain::Language;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub backend: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub transcription: Option<TranscriptionConfig>,
    #[serde(default)]
    pub fabric: Option<FabricConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// Data directory (relative to .symi/)
    pub home: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptionConfig {
    pub whisper_path: Option<String>,
    pub model: Option<String>,
    pub progress_interval_ms: Option<u64>,
    pub progress_step: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FabricConfig {
    pub binary: Option<String>,
    pub summary_pattern: Option<String>,
    pub translate_pattern: Option<String>,
    pub timeout_seconds: Option<u64>,
}

/// Which collaborator implementations to wire up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Canned responses, no external tools
    #[default]
    Mock,

    /// Local whisper binary plus the fabric CLI
    Local,
}

impl FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "local" => Ok(Self::Local),
            other => anyhow::bail!("Unknown backend '{}' (expected 'mock' or 'local')", other),
        }
    }
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute path to the data directory
    pub home: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    pub backend: Backend,
    /// Language for new entries when none is stored in settings
    pub language: Language,
    pub whisper: WhisperSettings,
    pub fabric: FabricSettings,
    pub progress: ProgressSettings,
}

#[derive(Debug, Clone)]
pub struct WhisperSettings {
    pub binary: String,
    pub model: String,
}

impl Default for WhisperSettings {
    fn default() -> Self {
        Self {
            binary: "/opt/homebrew/bin/whisper".to_string(),
            model: "base".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FabricSettings {
    /// Binary name; `None` means look for fabric-ai, then fabric
    pub binary: Option<String>,
    pub summary_pattern: String,
    pub translate_pattern: String,
    pub timeout: Duration,
}

impl Default for FabricSettings {
    fn default() -> Self {
        Self {
            binary: None,
            summary_pattern: "summarize".to_string(),
            translate_pattern: "translate".to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".symi").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's parent
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Merge a parsed config file over the defaults
fn apply_config_file(resolved: &mut ResolvedConfig, config: ConfigFile, config_path: &Path) -> Result<()> {
    let symi_dir = config_path.parent().unwrap_or(Path::new("."));

    if let Some(ref home) = config.paths.home {
        resolved.home = resolve_path(symi_dir, home);
    }

    if let Some(ref backend) = config.backend {
        resolved.backend = backend.parse()?;
    }

    if let Some(ref language) = config.language {
        resolved.language = language.parse::<Language>().map_err(|e: String| anyhow::anyhow!(e))?;
    }

    if let Some(transcription) = config.transcription {
        if let Some(binary) = transcription.whisper_path {
            resolved.whisper.binary = binary;
        }
        if let Some(model) = transcription.model {
            resolved.whisper.model = model;
        }
        if let Some(ms) = transcription.progress_interval_ms {
            resolved.progress.interval = Duration::from_millis(ms.max(1));
        }
        if let Some(step) = transcription.progress_step {
            resolved.progress.step = step.clamp(0.0, resolved.progress.ceiling);
        }
    }

    if let Some(fabric) = config.fabric {
        resolved.fabric.binary = fabric.binary.or(resolved.fabric.binary.take());
        if let Some(pattern) = fabric.summary_pattern {
            resolved.fabric.summary_pattern = pattern;
        }
        if let Some(pattern) = fabric.translate_pattern {
            resolved.fabric.translate_pattern = pattern;
        }
        if let Some(secs) = fabric.timeout_seconds {
            resolved.fabric.timeout = Duration::from_secs(secs);
        }
    }

    Ok(())
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".symi");

    let config_file = find_config_file();

    let mut resolved = ResolvedConfig {
        home: default_home,
        config_file: config_file.clone(),
        backend: Backend::default(),
        language: Language::default(),
        whisper: WhisperSettings::default(),
        fabric: FabricSettings::default(),
        progress: ProgressSettings::default(),
    };

    if let Some(ref config_path) = config_file {
        let config = load_config_file(config_path)?;
        apply_config_file(&mut resolved, config, config_path)?;
    }

    // Environment wins over the file
    if let Ok(env_home) = std::env::var("SYMI_HOME") {
        resolved.home = PathBuf::from(env_home);
    }
    if let Ok(env_backend) = std::env::var("SYMI_BACKEND") {
        resolved.backend = env_backend.parse()?;
    }
    if let Ok(whisper) = std::env::var("WHISPER_PATH") {
        resolved.whisper.binary = whisper;
    }

    Ok(resolved)
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| {
        load_config().map_err(|e| e.to_string())
    });

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn defaults(home: &Path) -> ResolvedConfig {
        ResolvedConfig {
            home: home.to_path_buf(),
            config_file: None,
            backend: Backend::Mock,
            language: Language::English,
            whisper: WhisperSettings::default(),
            fabric: FabricSettings::default(),
            progress: ProgressSettings::default(),
        }
    }

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let symi_dir = temp.path().join(".symi");
        std::fs::create_dir_all(&symi_dir).unwrap();

        let config_path = symi_dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(
            file,
            r#"
version: "1.0"
paths:
  home: ./data
backend: local
language: es
transcription:
  model: small
  progress_interval_ms: 50
fabric:
  summary_pattern: summarize_medical
  timeout_seconds: 30
"#
        )
        .unwrap();

        let config = load_config_file(&config_path).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.paths.home, Some("./data".to_string()));
        assert_eq!(config.backend, Some("local".to_string()));

        let mut resolved = defaults(temp.path());
        apply_config_file(&mut resolved, config, &config_path).unwrap();

        assert_eq!(resolved.home, symi_dir.join("data"));
        assert_eq!(resolved.backend, Backend::Local);
        assert_eq!(resolved.language, Language::Spanish);
        assert_eq!(resolved.whisper.model, "small");
        assert_eq!(resolved.progress.interval, Duration::from_millis(50));
        assert_eq!(resolved.fabric.summary_pattern, "summarize_medical");
        assert_eq!(resolved.fabric.translate_pattern, "translate");
        assert_eq!(resolved.fabric.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_invalid_backend_rejected() {
        assert!("cloud".parse::<Backend>().is_err());
        assert_eq!("MOCK".parse::<Backend>().unwrap(), Backend::Mock);
    }

    #[test]
    fn test_resolve_relative_path() {
        let base = PathBuf::from("/home/user/project");

        assert_eq!(
            resolve_path(&base, "./subdir"),
            PathBuf::from("/home/user/project/subdir")
        );
        assert_eq!(
            resolve_path(&base, "/absolute/path"),
            PathBuf::from("/absolute/path")
        );
    }
}
