//! Languages supported for summaries and translation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

/// Language tag attached to entries and passed to collaborators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "en")]
    English,

    #[serde(rename = "zh")]
    Chinese,

    #[serde(rename = "es")]
    Spanish,

    #[serde(rename = "fr")]
    French,
}

impl Language {
    /// All supported languages, in menu order
    pub const ALL: [Language; 4] = [
        Language::English,
        Language::Chinese,
        Language::Spanish,
        Language::French,
    ];

    /// ISO 639-1 code
    pub fn code(&self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Chinese => "zh",
            Self::Spanish => "es",
            Self::French => "fr",
        }
    }

    /// Native display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Chinese => "中文",
            Self::Spanish => "Español",
            Self::French => "Français",
        }
    }

    /// Decode a stored language, using the default for codes this build does not know.
    ///
    /// Used for persisted records so one unfamiliar code cannot fail a whole collection.
    pub fn deserialize_or_default<'de, D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        match value.as_str().and_then(|code| code.parse().ok()) {
            Some(language) => Ok(language),
            None => {
                warn!(language = %value, "Unknown language in stored record, using default");
                Ok(Self::default())
            }
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|lang| lang.code() == needle || lang.display_name().to_lowercase() == needle)
            .ok_or_else(|| format!("Unsupported language: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_serializes_as_code() {
        let json = serde_json::to_string(&Language::Spanish).unwrap();
        assert_eq!(json, "\"es\"");

        let parsed: Language = serde_json::from_str("\"zh\"").unwrap();
        assert_eq!(parsed, Language::Chinese);
    }

    #[test]
    fn test_language_from_str() {
        assert_eq!("FR".parse::<Language>().unwrap(), Language::French);
        assert_eq!("english".parse::<Language>().unwrap(), Language::English);
        assert!("klingon".parse::<Language>().is_err());
    }

    #[derive(Deserialize)]
    struct Stored {
        #[serde(deserialize_with = "Language::deserialize_or_default")]
        language: Language,
    }

    #[test]
    fn test_stored_language_falls_back_to_default() {
        let known: Stored = serde_json::from_str(r#"{"language": "fr"}"#).unwrap();
        assert_eq!(known.language, Language::French);

        let unknown: Stored = serde_json::from_str(r#"{"language": "de"}"#).unwrap();
        assert_eq!(unknown.language, Language::English);

        let wrong_type: Stored = serde_json::from_str(r#"{"language": 7}"#).unwrap();
        assert_eq!(wrong_type.language, Language::English);

        // Strict decoding stays strict for settings and CLI input
        assert!(serde_json::from_str::<Language>("\"de\"").is_err());
    }
}
