// src/actions/summarize.rs
// Summarize a whole section, inserted at its start or end

use super::input::{base_context, finish_request, placement_option, validate_selection};
use super::{ActionInput, AiAction};
use crate::error::{AiError, Result, codes};
use crate::types::{ActionRequest, Modality, Placement, ProposalScope, TextRange};

pub const ID: &str = "summarize-section";

#[derive(Debug, Clone, Default)]
pub struct SummarizeSection;

impl SummarizeSection {
    pub fn new() -> Self {
        Self
    }
}

impl AiAction for SummarizeSection {
    fn id(&self) -> &str {
        ID
    }

    fn display_name(&self) -> &str {
        "Summarize section"
    }

    fn description(&self) -> &str {
        "Write a short summary of the current section."
    }

    fn modalities(&self) -> Vec<Modality> {
        vec![Modality::Text]
    }

    fn requires_selection(&self) -> bool {
        false
    }

    fn scope(&self) -> ProposalScope {
        ProposalScope::Section
    }

    fn build_request(&self, input: &ActionInput) -> Result<ActionRequest> {
        validate_selection(input, false)?;
        if input.section.text.trim().is_empty() {
            return Err(AiError::validation(
                codes::INVALID_INPUT,
                "the section is empty; there is nothing to summarize",
            ));
        }

        let placement = placement_option(input, Placement::SectionEnd)?;
        let target = match placement {
            Placement::SectionStart => TextRange::at(0),
            Placement::SectionEnd => TextRange::at(input.section_len()),
            other => {
                return Err(AiError::validation(
                    codes::INVALID_INPUT,
                    format!("a summary goes at section_start or section_end, not {}", other),
                ));
            }
        };

        let mut context = base_context(input, String::new(), target, placement);
        context.surrounding_text = input.section.text.clone();
        finish_request(ID, self.modalities(), context, input, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{DocumentRef, SectionRef};
    use serde_json::json;

    fn input(text: &str) -> ActionInput {
        ActionInput::new(
            "user-1",
            DocumentRef::default(),
            SectionRef {
                id: "s-1".into(),
                title: "Chapter".into(),
                text: text.into(),
            },
        )
    }

    #[test]
    fn test_inserts_at_section_end_by_default() {
        let request = SummarizeSection::new().build_request(&input("One. Two.")).unwrap();
        let ctx = request.context();
        assert_eq!(ctx.target, TextRange::at(9));
        assert_eq!(ctx.placement, Placement::SectionEnd);
        assert!(ctx.original_text.is_empty());
        assert_eq!(ctx.surrounding_text, "One. Two.");
    }

    #[test]
    fn test_section_start_placement() {
        let input = input("One. Two.").with_option("placement", json!("section_start"));
        let request = SummarizeSection::new().build_request(&input).unwrap();
        assert_eq!(request.context().target, TextRange::at(0));
    }

    #[test]
    fn test_only_section_placements_allowed() {
        for placement in ["cover", "after_selection"] {
            let input = input("One. Two.").with_option("placement", json!(placement));
            let err = SummarizeSection::new().build_request(&input).unwrap_err();
            assert_eq!(err.code(), "ai.invalid_input");
        }
    }

    #[test]
    fn test_empty_section_rejected() {
        let err = SummarizeSection::new().build_request(&input("  ")).unwrap_err();
        assert_eq!(err.code(), "ai.invalid_input");
    }
}
