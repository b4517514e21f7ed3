// src/providers/registry.rs
// Ordered set of registered providers

use std::sync::Arc;
use tracing::{debug, info};

use super::AiProvider;
use crate::error::{AiError, Result};
use crate::types::Modality;

/// Providers in registration order. Built once at composition time, then
/// shared read-only.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn AiProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider. Ids must be unique.
    pub fn register(&mut self, provider: Arc<dyn AiProvider>) -> Result<()> {
        let id = provider.id().to_string();
        if self.get(&id).is_some() {
            return Err(AiError::DuplicateProvider(id));
        }

        let caps = provider.capabilities();
        info!(
            provider = %id,
            text = caps.text,
            image = caps.image,
            streaming = caps.is_streaming(),
            billable = caps.billable,
            "Registered AI provider"
        );
        self.providers.push(provider);
        Ok(())
    }

    /// Builder-style [`register`](Self::register)
    pub fn with(mut self, provider: Arc<dyn AiProvider>) -> Result<Self> {
        self.register(provider)?;
        Ok(self)
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn AiProvider>> {
        self.providers.iter().find(|p| p.id() == id).cloned()
    }

    pub fn all(&self) -> &[Arc<dyn AiProvider>] {
        &self.providers
    }

    pub fn ids(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// First available provider, in registration order, that can serve the
    /// modality (and stream it, if required)
    pub fn first_capable(&self, modality: Modality, streaming: bool) -> Option<Arc<dyn AiProvider>> {
        let found = self
            .providers
            .iter()
            .find(|p| p.is_available() && p.capabilities().can_serve(modality, streaming))
            .cloned();

        debug!(
            modality = %modality,
            streaming,
            found = found.as_ref().map(|p| p.id()).unwrap_or("none"),
            "Capability lookup"
        );
        found
    }

    /// Whether any available provider can serve the modality
    pub fn has_capable(&self, modality: Modality, streaming: bool) -> bool {
        self.first_capable(modality, streaming).is_some()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.ids())
            .finish()
    }
}
