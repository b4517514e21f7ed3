// src/actions/cover_image.rs
// Generate a cover image for the document

use serde_json::Value;

use super::input::{base_context, finish_request, validate_selection};
use super::{ActionInput, AiAction};
use crate::error::{AiError, Result, codes};
use crate::types::{ActionRequest, Modality, Placement, ProposalScope, TextRange};

pub const ID: &str = "generate-cover-image";

#[derive(Debug, Clone, Default)]
pub struct GenerateCoverImage {
    default_provider_id: Option<String>,
}

impl GenerateCoverImage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_provider(mut self, provider_id: impl Into<String>) -> Self {
        self.default_provider_id = Some(provider_id.into());
        self
    }
}

impl AiAction for GenerateCoverImage {
    fn id(&self) -> &str {
        ID
    }

    fn display_name(&self) -> &str {
        "Generate cover image"
    }

    fn description(&self) -> &str {
        "Create a cover illustration from the document title or a prompt."
    }

    fn modalities(&self) -> Vec<Modality> {
        vec![Modality::Image]
    }

    fn requires_selection(&self) -> bool {
        false
    }

    fn scope(&self) -> ProposalScope {
        ProposalScope::Document
    }

    fn default_provider_id(&self) -> Option<&str> {
        self.default_provider_id.as_deref()
    }

    fn build_request(&self, input: &ActionInput) -> Result<ActionRequest> {
        validate_selection(input, false)?;

        let title = input.document.title.trim();
        let prompt = match input.instruction() {
            Some(instruction) => instruction.to_string(),
            None if !title.is_empty() => format!("Cover illustration for \"{}\"", title),
            None => {
                return Err(AiError::validation(
                    codes::INVALID_INPUT,
                    "give a prompt or a document title for the cover",
                ));
            }
        };

        let context = base_context(input, String::new(), TextRange::at(0), Placement::Cover);
        Ok(finish_request(ID, self.modalities(), context, input, self.default_provider_id())?
            .with_input("prompt", Value::String(prompt)))
    }
}
