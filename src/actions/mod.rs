// src/actions/mod.rs
// Declarative AI actions and the catalog that holds them

mod continue_writing;
mod cover_image;
mod input;
mod rewrite;
mod summarize;
mod translate;

pub use continue_writing::ContinueWriting;
pub use cover_image::GenerateCoverImage;
pub use input::{ActionInput, DocumentRef, SURROUNDING_RADIUS, SectionRef};
pub use rewrite::RewriteSelection;
pub use summarize::SummarizeSection;
pub use translate::TranslateSelection;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::error::{AiError, Result};
use crate::types::{ActionRequest, Modality, ProposalScope};

/// A named editing intent that knows how to build its provider request
pub trait AiAction: Send + Sync {
    fn id(&self) -> &str;

    fn display_name(&self) -> &str;

    fn description(&self) -> &str;

    /// Declared modalities; the first one drives routing
    fn modalities(&self) -> Vec<Modality>;

    fn requires_selection(&self) -> bool;

    fn scope(&self) -> ProposalScope;

    /// Provider to prefer over the configured default
    fn default_provider_id(&self) -> Option<&str> {
        None
    }

    /// Build a fresh request. Pure apart from the new id and timestamp.
    fn build_request(&self, input: &ActionInput) -> Result<ActionRequest>;

    fn primary_modality(&self) -> Modality {
        self.modalities().first().copied().unwrap_or(Modality::Text)
    }

    fn descriptor(&self) -> ActionDescriptor {
        ActionDescriptor {
            id: self.id().to_string(),
            display_name: self.display_name().to_string(),
            description: self.description().to_string(),
            modalities: self.modalities(),
            requires_selection: self.requires_selection(),
            scope: self.scope(),
            default_provider_id: self.default_provider_id().map(str::to_string),
        }
    }
}

/// Serializable summary of an action for menus and listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    pub id: String,
    pub display_name: String,
    pub description: String,
    pub modalities: Vec<Modality>,
    pub requires_selection: bool,
    pub scope: ProposalScope,
    pub default_provider_id: Option<String>,
}

/// Actions in registration order
#[derive(Default, Clone)]
pub struct ActionCatalog {
    actions: Vec<Arc<dyn AiAction>>,
}

impl ActionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with every built-in action
    pub fn with_defaults() -> Self {
        let mut catalog = Self::new();
        let builtins: Vec<Arc<dyn AiAction>> = vec![
            Arc::new(RewriteSelection::new()),
            Arc::new(TranslateSelection::new()),
            Arc::new(SummarizeSection::new()),
            Arc::new(ContinueWriting::new()),
            Arc::new(GenerateCoverImage::new()),
        ];
        for action in builtins {
            catalog.actions.push(action);
        }
        catalog
    }

    pub fn register(&mut self, action: Arc<dyn AiAction>) -> Result<()> {
        if self.get(action.id()).is_some() {
            return Err(AiError::Config(format!(
                "action '{}' is already registered",
                action.id()
            )));
        }
        debug!(action = %action.id(), "Registered action");
        self.actions.push(action);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn AiAction>> {
        self.actions.iter().find(|a| a.id() == id).cloned()
    }

    pub fn list(&self) -> Vec<ActionDescriptor> {
        self.actions.iter().map(|a| a.descriptor()).collect()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_in_order() {
        let ids: Vec<String> = ActionCatalog::with_defaults()
            .list()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(
            ids,
            vec![
                "rewrite-selection",
                "translate-selection",
                "summarize-section",
                "continue-writing",
                "generate-cover-image"
            ]
        );
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut catalog = ActionCatalog::with_defaults();
        let err = catalog.register(Arc::new(RewriteSelection::new())).unwrap_err();
        assert_eq!(err.code(), "ai.config");
        assert_eq!(catalog.len(), 5);
    }

    #[test]
    fn test_custom_default_provider_in_descriptor() {
        let mut catalog = ActionCatalog::new();
        catalog
            .register(Arc::new(RewriteSelection::new().with_default_provider("openai")))
            .unwrap();
        let descriptor = &catalog.list()[0];
        assert_eq!(descriptor.default_provider_id.as_deref(), Some("openai"));
        assert!(descriptor.requires_selection);
        assert_eq!(descriptor.scope, ProposalScope::Selection);
    }

    #[test]
    fn test_cover_image_descriptor() {
        let catalog = ActionCatalog::with_defaults();
        let action = catalog.get("generate-cover-image").unwrap();
        assert_eq!(action.primary_modality(), Modality::Image);
        assert!(!action.requires_selection());
        assert!(catalog.get("nope").is_none());
    }
}
