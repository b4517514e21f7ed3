// src/actions/translate.rs
// Translate the selected text into a target language

use super::input::{base_context, finish_request, selected_text, validate_selection};
use super::{ActionInput, AiAction};
use crate::error::{AiError, Result, codes};
use crate::types::{ActionRequest, Modality, Placement, ProposalScope};

pub const ID: &str = "translate-selection";

#[derive(Debug, Clone, Default)]
pub struct TranslateSelection;

impl TranslateSelection {
    pub fn new() -> Self {
        Self
    }
}

impl AiAction for TranslateSelection {
    fn id(&self) -> &str {
        ID
    }

    fn display_name(&self) -> &str {
        "Translate selection"
    }

    fn description(&self) -> &str {
        "Translate the selected text into the requested language."
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

    fn build_request(&self, input: &ActionInput) -> Result<ActionRequest> {
        validate_selection(input, true)?;
        if input.language().is_none() {
            return Err(AiError::validation(
                codes::LANGUAGE_REQUIRED,
                "choose a target language",
            ));
        }

        let context = base_context(
            input,
            selected_text(input),
            input.selection,
            Placement::AfterSelection,
        );
        finish_request(ID, self.modalities(), context, input, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{DocumentRef, SectionRef};
    use crate::types::TextRange;
    use serde_json::json;

    fn input() -> ActionInput {
        ActionInput::new(
            "user-1",
            DocumentRef::default(),
            SectionRef {
                id: "s-1".into(),
                title: String::new(),
                text: "Good morning".into(),
            },
        )
        .with_selection(TextRange::new(0, 12))
    }

    #[test]
    fn test_language_required() {
        let err = TranslateSelection::new().build_request(&input()).unwrap_err();
        assert_eq!(err.code(), "ai.language_required");

        let err = TranslateSelection::new()
            .build_request(&input().with_language("  "))
            .unwrap_err();
        assert_eq!(err.code(), "ai.language_required");
    }

    #[test]
    fn test_language_from_field_or_option() {
        let request = TranslateSelection::new()
            .build_request(&input().with_language("fr"))
            .unwrap();
        assert_eq!(request.context().language.as_deref(), Some("fr"));

        let request = TranslateSelection::new()
            .build_request(&input().with_option("language", json!("de")))
            .unwrap();
        assert_eq!(request.context().language.as_deref(), Some("de"));
        assert!(request.inputs().get("language").is_none());
    }

    #[test]
    fn test_selection_checked_before_language() {
        let mut input = input();
        input.selection = TextRange::at(0);
        input.selected_text.clear();
        let err = TranslateSelection::new().build_request(&input).unwrap_err();
        assert_eq!(err.code(), "ai.selection_required");
    }
}
