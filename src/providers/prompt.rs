// src/providers/prompt.rs
// Prompt construction for chat-style text providers

use crate::types::ActionRequest;

/// Static shared prefix for every writing prompt
const STATIC_PREFIX: &str = r#"You are a writing assistant embedded in a document editor.
Core principles:
- Preserve the author's voice and meaning unless asked otherwise
- Return only the replacement text, with no commentary or quotation marks
- Keep formatting plain; the editor handles styling
"#;

/// Builds the system and user prompt for one action request
#[derive(Debug, Clone)]
pub struct PromptBuilder<'a> {
    request: &'a ActionRequest,
}

impl<'a> PromptBuilder<'a> {
    pub fn new(request: &'a ActionRequest) -> Self {
        Self { request }
    }

    pub fn system_prompt(&self) -> String {
        let mut prompt = STATIC_PREFIX.to_string();
        prompt.push('\n');
        prompt.push_str(&format!("Task: {}", self.task_line()));
        if let Some(max_words) = self.request.constraint_u64("max_words") {
            prompt.push_str(&format!("\nUse at most {} words.", max_words));
        }
        prompt
    }

    pub fn user_prompt(&self) -> String {
        let ctx = self.request.context();
        let mut sections = Vec::new();

        if !ctx.document_title.is_empty() {
            sections.push(format!("Document: {}", ctx.document_title));
        }
        if let Some(instruction) = &ctx.instruction {
            sections.push(format!("Instruction: {}", instruction));
        }
        if let Some(language) = &ctx.language {
            sections.push(format!("Target language: {}", language));
        }
        for (key, value) in self.request.inputs() {
            let value = value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string());
            sections.push(format!("{}: {}", key, value));
        }
        if !ctx.surrounding_text.is_empty() && ctx.surrounding_text != ctx.original_text {
            sections.push(format!("Context:\n{}", ctx.surrounding_text));
        }
        if !ctx.original_text.is_empty() {
            sections.push(format!("Text:\n{}", ctx.original_text));
        }

        sections.join("\n\n")
    }

    fn task_line(&self) -> String {
        match self.request.action_id() {
            "rewrite-selection" => "rewrite the given text.".to_string(),
            "translate-selection" => "translate the given text.".to_string(),
            "summarize-section" => "summarize the given text in a few sentences.".to_string(),
            "continue-writing" => "continue the text naturally from where the context ends.".to_string(),
            other => format!("perform the '{}' action on the given text.", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Modality, Placement, RequestContext, TextRange};
    use serde_json::json;

    fn request() -> ActionRequest {
        ActionRequest::new(
            "rewrite-selection",
            vec![Modality::Text],
            RequestContext {
                document_id: "d".into(),
                document_title: "Field Notes".into(),
                section_id: "s".into(),
                selection: TextRange::new(0, 12),
                selected_text: "The cat sat.".into(),
                surrounding_text: "The cat sat. It was warm.".into(),
                original_text: "The cat sat.".into(),
                target: TextRange::new(0, 12),
                placement: Placement::AfterSelection,
                instruction: Some("make it vivid".into()),
                language: None,
            },
        )
        .with_input("tone", json!("playful"))
        .with_constraint("max_words", json!(20))
    }

    #[test]
    fn test_system_prompt_includes_task_and_limit() {
        let request = request();
        let prompt = PromptBuilder::new(&request).system_prompt();
        assert!(prompt.starts_with("You are a writing assistant"));
        assert!(prompt.contains("rewrite the given text"));
        assert!(prompt.contains("at most 20 words"));
    }

    #[test]
    fn test_user_prompt_sections() {
        let request = request();
        let prompt = PromptBuilder::new(&request).user_prompt();
        assert!(prompt.contains("Document: Field Notes"));
        assert!(prompt.contains("Instruction: make it vivid"));
        assert!(prompt.contains("tone: playful"));
        assert!(prompt.contains("Context:\nThe cat sat. It was warm."));
        assert!(prompt.ends_with("Text:\nThe cat sat."));
    }
}
