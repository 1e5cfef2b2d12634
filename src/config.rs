//! Configuration.
//!
//! Every field has a default, so an empty document is a valid configuration.

use crate::codec::DocumentFormat;
use crate::error::Result;
use crate::merge::MergeMode;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config for a [`Context`](crate::session::Context).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// What a record instruction does to keys it omits.
    pub merge_mode: MergeMode,

    /// Byte format of stored documents.
    pub document_format: DocumentFormat,

    /// Schedule created entities for insert right away. When off, entities
    /// stay transient until persisted explicitly.
    pub persist_on_create: bool,

    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            merge_mode: MergeMode::default(),
            document_format: DocumentFormat::default(),
            persist_on_create: true,
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Parses YAML; JSON is accepted as well.
    pub fn from_yaml_str(text: &str) -> Result<Config> {
        if text.trim().is_empty() {
            return Ok(Config::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Loads a configuration file. `.json` files are parsed as JSON,
    /// anything else as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            return Ok(serde_json::from_str(&text)?);
        }
        Config::from_yaml_str(&text)
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or filter directive: trace, debug, info, warn, error, off
    pub level: String,

    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = Config::from_yaml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.merge_mode, MergeMode::FullReplaceDeletesOmitted);
        assert_eq!(config.document_format, DocumentFormat::Json);
        assert!(config.persist_on_create);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_yaml() {
        let config = Config::from_yaml_str(
            r#"
merge_mode: shallow-preserve-omitted
logging:
  format: json
"#,
        )
        .unwrap();
        assert_eq!(config.merge_mode, MergeMode::ShallowPreserveOmitted);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.document_format, DocumentFormat::Json);
    }

    #[test]
    fn test_json_is_accepted() {
        let config = Config::from_yaml_str(r#"{"document_format": "yaml", "persist_on_create": false}"#).unwrap();
        assert_eq!(config.document_format, DocumentFormat::Yaml);
        assert!(!config.persist_on_create);
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        assert!(Config::from_yaml_str("merge_mode: sideways").is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = std::env::temp_dir().join(format!("entity-assign-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        std::fs::write(&path, r#"{"merge_mode": "shallow-preserve-omitted"}"#).unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.merge_mode, MergeMode::ShallowPreserveOmitted);
        std::fs::remove_dir_all(&dir).unwrap();

        assert!(matches!(
            Config::from_file(dir.join("missing.yaml")),
            Err(crate::error::Error::Io(_))
        ));
    }
}
