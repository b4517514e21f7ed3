// src/actions/rewrite.rs
// Rewrite the selected text according to an instruction

use super::input::{base_context, finish_request, selected_text, validate_selection};
use super::{ActionInput, AiAction};
use crate::error::Result;
use crate::types::{ActionRequest, Modality, Placement, ProposalScope};

pub const ID: &str = "rewrite-selection";

#[derive(Debug, Clone, Default)]
pub struct RewriteSelection {
    default_provider_id: Option<String>,
}

impl RewriteSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_provider(mut self, provider_id: impl Into<String>) -> Self {
        self.default_provider_id = Some(provider_id.into());
        self
    }
}

impl AiAction for RewriteSelection {
    fn id(&self) -> &str {
        ID
    }

    fn display_name(&self) -> &str {
        "Rewrite selection"
    }

    fn description(&self) -> &str {
        "Rewrite the selected text, optionally following an instruction such as \"shorten\"."
    }

    fn modalities(&self) -> Vec<Modality> {
        vec![Modality::Text]
    }

    fn requires_selection(&self) -> bool {
        true
    }

    fn scope(&self) -> ProposalScope {
        ProposalScope::Selection
    }

    fn default_provider_id(&self) -> Option<&str> {
        self.default_provider_id.as_deref()
    }

    fn build_request(&self, input: &ActionInput) -> Result<ActionRequest> {
        validate_selection(input, true)?;
        let context = base_context(
            input,
            selected_text(input),
            input.selection,
            Placement::AfterSelection,
        );
        finish_request(ID, self.modalities(), context, input, self.default_provider_id())
    }
}
