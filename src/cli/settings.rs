//! Settings CLI subcommands.
//!
//! Settings always live in the local store, even when entries are routed to
//! a remote backend, since the backend choice is itself a setting.

use anyhow::{Context, Result};
use clap::Subcommand;
use serde_json::Value;

use crate::domain::Language;
use crate::storage::settings::keys;
use crate::storage::LocalStore;

/// Settings-related subcommands
#[derive(Subcommand, Debug)]
pub enum SettingsCommands {
    /// Print one setting, or all of them
    Get {
        /// Setting key (e.g. "language", "cloud_storage_enabled")
        key: Option<String>,
    },

    /// Change a setting
    Set {
        key: String,

        /// New value; parsed as JSON when possible, otherwise stored as a string
        value: String,
    },
}

pub async fn execute_get(store: &LocalStore, key: Option<&str>) -> Result<()> {
    match key {
        Some(key) => match store.settings().get_raw(key).await {
            Some(value) => println!("{}", value),
            None => println!("{} is not set", key),
        },
        None => {
            let all = store.settings().all().await;
            if all.is_empty() {
                println!("No settings stored");
            }
            for (key, value) in all {
                println!("{:<24} {}", key, value);
            }
        }
    }

    Ok(())
}

pub async fn execute_set(store: &LocalStore, key: &str, raw: &str) -> Result<()> {
    let value = parse_value(key, raw)?;

    store
        .settings()
        .set_raw(key, value.clone())
        .await
        .with_context(|| format!("Failed to save setting '{}'", key))?;

    println!("{} = {}", key, value);
    Ok(())
}

/// Validate well-known keys and convert the raw argument to JSON
fn parse_value(key: &str, raw: &str) -> Result<Value> {
    match key {
        keys::LANGUAGE => {
            let language: Language = raw.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            Ok(Value::String(language.code().to_string()))
        }
        keys::CLOUD_STORAGE_ENABLED => {
            let enabled: bool = raw
                .trim()
                .parse()
                .with_context(|| format!("{} expects true or false", key))?;
            Ok(Value::Bool(enabled))
        }
        _ => Ok(serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_keys() {
        assert_eq!(parse_value("language", "zh").unwrap(), Value::String("zh".into()));
        assert!(parse_value("language", "klingon").is_err());
        assert_eq!(
            parse_value("cloud_storage_enabled", "true").unwrap(),
            Value::Bool(true)
        );
        assert!(parse_value("cloud_storage_enabled", "yes").is_err());
    }

    #[test]
    fn test_parse_free_form() {
        assert_eq!(parse_value("reminder_hour", "9").unwrap(), serde_json::json!(9));
        assert_eq!(
            parse_value("nickname", "sam").unwrap(),
            Value::String("sam".into())
        );
    }
}
