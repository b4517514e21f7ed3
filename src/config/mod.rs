// src/config/mod.rs
// AI configuration: defaults, file loading and environment overrides

pub mod env;
pub mod file;

use serde::{Deserialize, Serialize};

pub use env::{EnvOverrides, parse_bool};
pub use file::ConfigFile;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Settings for the OpenAI-compatible provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiSettings {
    pub base_url: String,
    pub model: String,
    /// Normally supplied via `DRAFTSMITH_OPENAI_API_KEY` rather than the file
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
            api_key: None,
        }
    }
}

/// Runtime configuration of the orchestration core
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Global kill switch; applies to non-billable providers too
    pub enabled: bool,
    pub default_text_provider_id: Option<String>,
    pub default_image_provider_id: Option<String>,
    pub allow_provider_fallback: bool,
    pub streaming_enabled: bool,
    /// Log level for the binary (error, warn, info, debug, trace)
    pub log_level: String,
    pub openai: OpenAiSettings,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_text_provider_id: Some("mock-text".to_string()),
            default_image_provider_id: Some("mock-image".to_string()),
            allow_provider_fallback: true,
            streaming_enabled: true,
            log_level: "info".to_string(),
            openai: OpenAiSettings::default(),
        }
    }
}

impl AiConfig {
    /// File config (or defaults) with environment overrides applied
    pub fn load() -> Self {
        let mut config = ConfigFile::load().into_config();
        EnvOverrides::from_env().apply(&mut config);
        config
    }
}
