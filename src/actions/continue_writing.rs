// src/actions/continue_writing.rs
// Continue the text from the cursor (or the end of the section)

use super::input::{base_context, finish_request, validate_selection};
use super::{ActionInput, AiAction};
use crate::error::Result;
use crate::types::{ActionRequest, Modality, Placement, ProposalScope, TextRange};

pub const ID: &str = "continue-writing";

#[derive(Debug, Clone, Default)]
pub struct ContinueWriting;

impl ContinueWriting {
    pub fn new() -> Self {
        Self
    }
}

impl AiAction for ContinueWriting {
    fn id(&self) -> &str {
        ID
    }

    fn display_name(&self) -> &str {
        "Continue writing"
    }

    fn description(&self) -> &str {
        "Draft the next few sentences after the cursor."
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

        // A selection (or caret) marks the insertion point; none means append
        let (target, placement) = if input.selection == TextRange::default() && input.section_len() > 0 {
            (TextRange::at(input.section_len()), Placement::SectionEnd)
        } else {
            (TextRange::at(input.selection.end), Placement::AfterSelection)
        };

        let mut context = base_context(input, String::new(), target, placement);
        let preceding: String = input.section.text.chars().take(target.start).collect();
        let skip = preceding.chars().count().saturating_sub(super::SURROUNDING_RADIUS * 2);
        context.surrounding_text = preceding.chars().skip(skip).collect();

        finish_request(ID, self.modalities(), context, input, None)
    }
}
