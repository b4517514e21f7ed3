// src/config/env.rs
// Environment overrides - single source of truth for DRAFTSMITH_* variables

use tracing::{debug, warn};

use super::AiConfig;

pub const ENV_ENABLED: &str = "DRAFTSMITH_AI_ENABLED";
pub const ENV_TEXT_PROVIDER: &str = "DRAFTSMITH_TEXT_PROVIDER";
pub const ENV_IMAGE_PROVIDER: &str = "DRAFTSMITH_IMAGE_PROVIDER";
pub const ENV_ALLOW_FALLBACK: &str = "DRAFTSMITH_ALLOW_FALLBACK";
pub const ENV_STREAMING: &str = "DRAFTSMITH_STREAMING";
pub const ENV_LOG_LEVEL: &str = "DRAFTSMITH_LOG";
pub const ENV_OPENAI_API_KEY: &str = "DRAFTSMITH_OPENAI_API_KEY";
pub const ENV_OPENAI_BASE_URL: &str = "DRAFTSMITH_OPENAI_BASE_URL";
pub const ENV_OPENAI_MODEL: &str = "DRAFTSMITH_OPENAI_MODEL";

/// Values read from the environment, each optional
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    pub enabled: Option<bool>,
    pub text_provider: Option<String>,
    pub image_provider: Option<String>,
    pub allow_fallback: Option<bool>,
    pub streaming: Option<bool>,
    pub log_level: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub openai_model: Option<String>,
}

impl EnvOverrides {
    /// Read overrides from the process environment (after loading `.env`)
    pub fn from_env() -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "Loaded .env file");
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read overrides through `lookup`; empty values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let read_bool = |name: &str| {
            let raw = read(name)?;
            let parsed = parse_bool(&raw);
            if parsed.is_none() {
                warn!(var = name, value = %raw, "Ignoring non-boolean environment value");
            }
            parsed
        };

        Self {
            enabled: read_bool(ENV_ENABLED),
            text_provider: read(ENV_TEXT_PROVIDER),
            image_provider: read(ENV_IMAGE_PROVIDER),
            allow_fallback: read_bool(ENV_ALLOW_FALLBACK),
            streaming: read_bool(ENV_STREAMING),
            log_level: read(ENV_LOG_LEVEL),
            openai_api_key: read(ENV_OPENAI_API_KEY),
            openai_base_url: read(ENV_OPENAI_BASE_URL),
            openai_model: read(ENV_OPENAI_MODEL),
        }
    }

    pub fn apply(self, config: &mut AiConfig) {
        if let Some(enabled) = self.enabled {
            config.enabled = enabled;
        }
        if let Some(id) = self.text_provider {
            config.default_text_provider_id = Some(id);
        }
        if let Some(id) = self.image_provider {
            config.default_image_provider_id = Some(id);
        }
        if let Some(allow) = self.allow_fallback {
            config.allow_provider_fallback = allow;
        }
        if let Some(streaming) = self.streaming {
            config.streaming_enabled = streaming;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        if let Some(key) = self.openai_api_key {
            config.openai.api_key = Some(key);
        }
        if let Some(url) = self.openai_base_url {
            config.openai.base_url = url;
        }
        if let Some(model) = self.openai_model {
            config.openai.model = model;
        }

        debug!(
            enabled = config.enabled,
            fallback = config.allow_provider_fallback,
            streaming = config.streaming_enabled,
            openai_key = config.openai.api_key.is_some(),
            "Applied environment overrides"
        );
    }
}

/// Parse a boolean flag value
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
