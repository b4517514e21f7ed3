// src/providers/mod.rs
// AI provider abstraction: capability declarations, blocking and streaming calls

mod logging;
mod mock_image;
mod mock_text;
mod openai_compat;
mod prompt;
pub mod registry;

pub use mock_image::MockImageProvider;
pub use mock_text::MockTextProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use registry::ProviderRegistry;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::AiConfig;
use crate::error::{ProviderError, Result};
use crate::types::{ActionRequest, Artifact, Modality, ProviderResult, ProviderUsage};

/// One item of a provider stream
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderChunk {
    Text(String),
    Image(Artifact),
    Usage(ProviderUsage),
}

/// Stream of chunks from a streaming-capable provider
pub type ProviderStream = Pin<Box<dyn Stream<Item = Result<ProviderChunk, ProviderError>> + Send>>;

/// Which modalities a provider can stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StreamingCapabilities {
    pub text: bool,
    pub image: bool,
}

/// What a provider declares it can do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProviderCapabilities {
    pub text: bool,
    pub image: bool,
    pub streaming: StreamingCapabilities,
    /// Calls count against the caller's quota
    pub billable: bool,
}

impl ProviderCapabilities {
    pub fn supports(&self, modality: Modality) -> bool {
        match modality {
            Modality::Text => self.text,
            Modality::Image => self.image,
        }
    }

    pub fn supports_streaming(&self, modality: Modality) -> bool {
        self.supports(modality)
            && match modality {
                Modality::Text => self.streaming.text,
                Modality::Image => self.streaming.image,
            }
    }

    pub fn can_serve(&self, modality: Modality, streaming: bool) -> bool {
        if streaming {
            self.supports_streaming(modality)
        } else {
            self.supports(modality)
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming.text || self.streaming.image
    }
}

/// Universal AI provider interface
#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Stable identifier used for routing and usage accounting
    fn id(&self) -> &str;

    /// Human-readable name
    fn display_name(&self) -> &str {
        self.id()
    }

    fn capabilities(&self) -> ProviderCapabilities;

    /// Whether the provider can take calls right now (e.g. has credentials)
    fn is_available(&self) -> bool {
        true
    }

    /// Run one request to completion
    async fn execute(
        &self,
        request: &ActionRequest,
        cancel: CancellationToken,
    ) -> Result<ProviderResult, ProviderError>;

    /// Open a stream for one request (streaming providers only)
    async fn stream(
        &self,
        _request: &ActionRequest,
        _cancel: CancellationToken,
    ) -> Result<ProviderStream, ProviderError> {
        Err(ProviderError::new(self.id(), "streaming is not supported"))
    }
}

pub const MOCK_TEXT_ID: &str = "mock-text";
pub const MOCK_IMAGE_ID: &str = "mock-image";
pub const OPENAI_ID: &str = "openai";

/// Registry with the built-in providers.
///
/// The OpenAI-compatible provider is registered first when an API key is
/// configured, so fallback prefers it over the local mocks.
pub fn default_registry(config: &AiConfig) -> Result<ProviderRegistry> {
    let mut registry = ProviderRegistry::new();

    if config.openai.api_key.is_some() {
        info!(model = %config.openai.model, "OpenAI-compatible provider initialized");
        registry.register(Arc::new(OpenAiCompatProvider::new(OPENAI_ID, config.openai.clone())))?;
    }
    registry.register(Arc::new(MockTextProvider::new(MOCK_TEXT_ID)))?;
    registry.register(Arc::new(MockImageProvider::new(MOCK_IMAGE_ID)))?;

    info!(providers = ?registry.ids(), "AI providers available");
    Ok(registry)
}

/// Count words the way providers and word-limit constraints do
pub(crate) fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities_streaming_requires_modality() {
        let caps = ProviderCapabilities {
            text: false,
            image: false,
            streaming: StreamingCapabilities {
                text: true,
                image: false,
            },
            billable: true,
        };
        assert!(!caps.supports_streaming(Modality::Text));
        assert!(!caps.can_serve(Modality::Text, true));
    }

    #[test]
    fn test_capabilities_can_serve() {
        let caps = ProviderCapabilities {
            text: true,
            image: false,
            streaming: StreamingCapabilities {
                text: true,
                image: false,
            },
            billable: false,
        };
        assert!(caps.can_serve(Modality::Text, false));
        assert!(caps.can_serve(Modality::Text, true));
        assert!(!caps.can_serve(Modality::Image, false));
        assert!(caps.is_streaming());
    }

    #[test]
    fn test_default_registry() {
        let registry = default_registry(&AiConfig::default()).unwrap();
        assert_eq!(registry.ids(), vec!["mock-text", "mock-image"]);

        let mut config = AiConfig::default();
        config.openai.api_key = Some("sk-test".into());
        let registry = default_registry(&config).unwrap();
        assert_eq!(registry.ids(), vec!["openai", "mock-text", "mock-image"]);
    }

    #[test]
    fn test_word_count() {
        assert_eq!(word_count("The cat  sat.\n"), 3);
        assert_eq!(word_count("   "), 0);
    }
}
