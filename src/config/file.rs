// src/config/file.rs
// File-based configuration from ~/.draftsmith/config.toml

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::AiConfig;

/// Top-level config file structure
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub ai: AiConfig,
}

impl ConfigFile {
    /// Load config from ~/.draftsmith/config.toml
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load config from `path`; a missing or unparseable file yields defaults
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    debug!(path = %path.display(), "Loaded config from file");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to parse config file");
                    Self::default()
                }
            },
            Err(_) => {
                debug!(path = %path.display(), "Config file not found, using defaults");
                Self::default()
            }
        }
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".draftsmith")
            .join("config.toml")
    }

    pub fn into_config(self) -> AiConfig {
        self.ai
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_config() {
        let toml = r#"
[ai]
enabled = true
default_text_provider_id = "openai"
allow_provider_fallback = false

[ai.openai]
model = "gpt-test"
"#;
        let config: ConfigFile = toml::from_str(toml).unwrap();
        assert_eq!(config.ai.default_text_provider_id.as_deref(), Some("openai"));
        assert!(!config.ai.allow_provider_fallback);
        // Unset fields keep their defaults
        assert!(config.ai.streaming_enabled);
        assert_eq!(config.ai.default_image_provider_id.as_deref(), Some("mock-image"));
        assert_eq!(config.ai.openai.model, "gpt-test");
        assert_eq!(config.ai.openai.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn test_parse_empty_config() {
        let config: ConfigFile = toml::from_str("").unwrap();
        assert_eq!(config.ai, AiConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[ai]\nstreaming_enabled = false").unwrap();
        let config = ConfigFile::load_from(file.path()).into_config();
        assert!(!config.streaming_enabled);
        assert!(config.enabled);
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[ai\nenabled = maybe").unwrap();
        let config = ConfigFile::load_from(file.path()).into_config();
        assert_eq!(config, AiConfig::default());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigFile::load_from(&dir.path().join("nope.toml")).into_config();
        assert_eq!(config, AiConfig::default());
    }
}
