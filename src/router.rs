// src/router.rs
// Picks exactly one provider per request, with auditable fallback

use std::sync::Arc;
use tracing::{info, warn};

use crate::config::AiConfig;
use crate::error::{AiError, Result};
use crate::providers::{AiProvider, ProviderRegistry};
use crate::types::Modality;

/// Routing knobs taken from [`AiConfig`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingPolicy {
    pub default_text_provider_id: Option<String>,
    pub default_image_provider_id: Option<String>,
    pub allow_fallback: bool,
}

impl RoutingPolicy {
    pub fn from_config(config: &AiConfig) -> Self {
        Self {
            default_text_provider_id: config.default_text_provider_id.clone(),
            default_image_provider_id: config.default_image_provider_id.clone(),
            allow_fallback: config.allow_provider_fallback,
        }
    }

    pub fn default_for(&self, modality: Modality) -> Option<&str> {
        match modality {
            Modality::Text => self.default_text_provider_id.as_deref(),
            Modality::Image => self.default_image_provider_id.as_deref(),
        }
    }
}

/// The chosen provider and why it was chosen
#[derive(Clone)]
pub struct RouteDecision {
    pub provider: Arc<dyn AiProvider>,
    pub provider_id: String,
    pub was_fallback_used: bool,
    pub reason: String,
}

impl std::fmt::Debug for RouteDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteDecision")
            .field("provider_id", &self.provider_id)
            .field("was_fallback_used", &self.was_fallback_used)
            .field("reason", &self.reason)
            .finish()
    }
}

/// Stateless selector over a shared registry
#[derive(Debug, Clone)]
pub struct ProviderRouter {
    registry: Arc<ProviderRegistry>,
    policy: RoutingPolicy,
}

impl ProviderRouter {
    pub fn new(registry: Arc<ProviderRegistry>, policy: RoutingPolicy) -> Self {
        Self { registry, policy }
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    pub fn policy(&self) -> &RoutingPolicy {
        &self.policy
    }

    /// Select a provider for `modality`.
    ///
    /// `preferred` is the request's hint (action default or caller option);
    /// without one the configured default for the modality is used.
    pub fn route(
        &self,
        modality: Modality,
        streaming: bool,
        preferred: Option<&str>,
    ) -> Result<RouteDecision> {
        let (preferred, source) = match preferred {
            Some(id) => (Some(id), "requested"),
            None => (self.policy.default_for(modality), "configured default"),
        };

        let miss = match preferred {
            Some(id) => match self.registry.get(id) {
                Some(provider) if !provider.is_available() => {
                    format!("{} provider '{}' is unavailable", source, id)
                }
                Some(provider) if !provider.capabilities().can_serve(modality, streaming) => {
                    format!(
                        "{} provider '{}' cannot serve {}{}",
                        source,
                        id,
                        modality,
                        if streaming { " streaming" } else { "" }
                    )
                }
                Some(provider) => {
                    let decision = RouteDecision {
                        provider_id: provider.id().to_string(),
                        provider,
                        was_fallback_used: false,
                        reason: format!("{} provider '{}'", source, id),
                    };
                    info!(
                        provider = %decision.provider_id,
                        modality = %modality,
                        streaming,
                        reason = %decision.reason,
                        "Routed request"
                    );
                    return Ok(decision);
                }
                None => format!("{} provider '{}' is not registered", source, id),
            },
            None => format!("no {} provider configured", modality),
        };

        if !self.policy.allow_fallback {
            warn!(modality = %modality, streaming, reason = %miss, "Routing failed, fallback disabled");
            return Err(AiError::FallbackDisabled {
                preferred: preferred.map(str::to_string),
                modality,
                streaming,
            });
        }

        match self.registry.first_capable(modality, streaming) {
            Some(provider) => {
                let decision = RouteDecision {
                    provider_id: provider.id().to_string(),
                    reason: format!("{}; fell back to '{}'", miss, provider.id()),
                    provider,
                    was_fallback_used: true,
                };
                warn!(
                    provider = %decision.provider_id,
                    modality = %modality,
                    streaming,
                    reason = %decision.reason,
                    "Routed request via fallback"
                );
                Ok(decision)
            }
            None => {
                warn!(modality = %modality, streaming, reason = %miss, "No capable provider");
                Err(AiError::NoCapableProvider { modality, streaming })
            }
        }
    }

    /// Side-effect-free pre-check
    pub fn can_route(&self, modality: Modality, streaming: bool, preferred: Option<&str>) -> bool {
        let preferred = preferred.or_else(|| self.policy.default_for(modality));
        let preferred_ok = preferred
            .and_then(|id| self.registry.get(id))
            .is_some_and(|p| p.is_available() && p.capabilities().can_serve(modality, streaming));

        preferred_ok || (self.policy.allow_fallback && self.registry.has_capable(modality, streaming))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{MockImageProvider, MockTextProvider};

    fn registry() -> Arc<ProviderRegistry> {
        Arc::new(
            ProviderRegistry::new()
                .with(Arc::new(MockTextProvider::new("mock-text")))
                .unwrap()
                .with(Arc::new(MockTextProvider::new("plain-text").without_streaming()))
                .unwrap()
                .with(Arc::new(MockImageProvider::new("mock-image")))
                .unwrap(),
        )
    }

    fn policy(allow_fallback: bool) -> RoutingPolicy {
        RoutingPolicy {
            default_text_provider_id: Some("plain-text".into()),
            default_image_provider_id: Some("mock-image".into()),
            allow_fallback,
        }
    }

    #[test]
    fn test_configured_default_wins() {
        let router = ProviderRouter::new(registry(), policy(true));
        let decision = router.route(Modality::Text, false, None).unwrap();
        assert_eq!(decision.provider_id, "plain-text");
        assert!(!decision.was_fallback_used);
        assert!(decision.reason.contains("configured default"));
    }

    #[test]
    fn test_hint_overrides_default() {
        let router = ProviderRouter::new(registry(), policy(true));
        let decision = router.route(Modality::Text, false, Some("mock-text")).unwrap();
        assert_eq!(decision.provider_id, "mock-text");
        assert!(!decision.was_fallback_used);
    }

    #[test]
    fn test_fallback_when_default_cannot_stream() {
        let router = ProviderRouter::new(registry(), policy(true));
        let decision = router.route(Modality::Text, true, None).unwrap();
        assert_eq!(decision.provider_id, "mock-text");
        assert!(decision.was_fallback_used);
        assert!(decision.reason.contains("fell back to 'mock-text'"));
    }

    #[test]
    fn test_fallback_for_unknown_preferred() {
        let router = ProviderRouter::new(registry(), policy(true));
        let decision = router.route(Modality::Image, false, Some("dalle")).unwrap();
        assert_eq!(decision.provider_id, "mock-image");
        assert!(decision.was_fallback_used);
        assert!(decision.reason.contains("not registered"));
    }

    #[test]
    fn test_fallback_disabled_is_routing_error() {
        let router = ProviderRouter::new(registry(), policy(false));
        let err = router.route(Modality::Text, true, None).unwrap_err();
        assert!(matches!(
            err,
            AiError::FallbackDisabled { ref preferred, modality: Modality::Text, streaming: true }
                if preferred.as_deref() == Some("plain-text")
        ));
        assert!(!router.can_route(Modality::Text, true, None));
        assert!(router.can_route(Modality::Text, false, None));
    }

    #[test]
    fn test_no_capable_provider() {
        let router = ProviderRouter::new(registry(), policy(true));
        let err = router.route(Modality::Image, true, None).unwrap_err();
        assert!(matches!(
            err,
            AiError::NoCapableProvider { modality: Modality::Image, streaming: true }
        ));
        assert!(!router.can_route(Modality::Image, true, None));
    }

    #[test]
    fn test_no_default_configured_falls_back() {
        let router = ProviderRouter::new(registry(), RoutingPolicy {
            allow_fallback: true,
            ..Default::default()
        });
        let decision = router.route(Modality::Text, false, None).unwrap();
        assert_eq!(decision.provider_id, "mock-text");
        assert!(decision.was_fallback_used);
        assert!(decision.reason.starts_with("no text provider configured"));
    }
}
