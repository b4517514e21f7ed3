// src/actions/input.rs
// Caller-side input to an action, plus the shared request-building steps

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::{AiError, Result, codes};
use crate::types::{ActionRequest, Modality, Placement, RequestContext, TextRange};

/// Characters of context kept on each side of a selection
pub const SURROUNDING_RADIUS: usize = 400;

/// Option keys consumed by request building; everything else becomes a
/// provider input
pub const OPTION_PROVIDER: &str = "provider";
pub const OPTION_MAX_WORDS: &str = "max_words";
pub const OPTION_PLACEMENT: &str = "placement";
pub const OPTION_LANGUAGE: &str = "language";

const RESERVED_OPTIONS: [&str; 4] = [OPTION_PROVIDER, OPTION_MAX_WORDS, OPTION_PLACEMENT, OPTION_LANGUAGE];

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DocumentRef {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SectionRef {
    pub id: String,
    pub title: String,
    /// Full current text of the section
    pub text: String,
}

/// Everything the caller knows when invoking an action
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ActionInput {
    pub caller_id: String,
    pub document: DocumentRef,
    pub section: SectionRef,
    pub selection: TextRange,
    pub selected_text: String,
    pub instruction: Option<String>,
    pub language: Option<String>,
    #[serde(default)]
    pub options: BTreeMap<String, Value>,
}

impl ActionInput {
    pub fn new(caller_id: impl Into<String>, document: DocumentRef, section: SectionRef) -> Self {
        Self {
            caller_id: caller_id.into(),
            document,
            section,
            ..Default::default()
        }
    }

    /// Select `range` of the section; the selected text is taken from it
    pub fn with_selection(mut self, range: TextRange) -> Self {
        self.selected_text = range.slice(&self.section.text).unwrap_or_default().to_string();
        self.selection = range;
        self
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = Some(instruction.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Language from the field or the `language` option
    pub fn language(&self) -> Option<&str> {
        self.language
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or_else(|| self.option_str(OPTION_LANGUAGE))
    }

    pub fn instruction(&self) -> Option<&str> {
        self.instruction
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn section_len(&self) -> usize {
        self.section.text.chars().count()
    }
}

/// Check the selection range; with `required`, it must also cover
/// non-blank text
pub(crate) fn validate_selection(input: &ActionInput, required: bool) -> Result<()> {
    let range = input.selection;
    if !range.is_valid() {
        return Err(AiError::validation(
            codes::INVALID_SELECTION,
            format!("selection {} is inverted", range),
        ));
    }
    if !range.fits(input.section_len()) {
        return Err(AiError::validation(
            codes::INVALID_SELECTION,
            format!(
                "selection {} is outside section '{}' ({} chars)",
                range,
                input.section.id,
                input.section_len()
            ),
        ));
    }
    if !required {
        return Ok(());
    }

    if input.selected_text.trim().is_empty() {
        return Err(AiError::validation(
            codes::SELECTION_REQUIRED,
            "select some text first",
        ));
    }
    if range.is_empty() {
        return Err(AiError::validation(
            codes::INVALID_SELECTION,
            format!("selection {} is empty but text was reported as selected", range),
        ));
    }
    // Reported text must match the section, or the replacement lands on the wrong text
    if range.slice(&input.section.text) != Some(input.selected_text.as_str()) {
        return Err(AiError::validation(
            codes::INVALID_SELECTION,
            format!(
                "selected text does not match section '{}' at {}",
                input.section.id, range
            ),
        ));
    }
    Ok(())
}

/// Selected text as it stands in the section, falling back to what the
/// caller reported
pub(crate) fn selected_text(input: &ActionInput) -> String {
    match input.selection.slice(&input.section.text) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => input.selected_text.clone(),
    }
}

/// Up to `SURROUNDING_RADIUS` chars either side of `range`
pub(crate) fn surrounding_text(text: &str, range: TextRange) -> String {
    let start = range.start.saturating_sub(SURROUNDING_RADIUS);
    let end = range.end.saturating_add(SURROUNDING_RADIUS);
    text.chars().skip(start).take(end.saturating_sub(start)).collect()
}

pub(crate) fn placement_option(input: &ActionInput, default: Placement) -> Result<Placement> {
    match input.option_str(OPTION_PLACEMENT) {
        None => Ok(default),
        Some(raw) => Placement::from_str(raw).ok_or_else(|| {
            AiError::validation(codes::INVALID_INPUT, format!("unknown placement '{}'", raw))
        }),
    }
}

/// Context common to every action; callers fill in the target fields
pub(crate) fn base_context(
    input: &ActionInput,
    original_text: String,
    target: TextRange,
    placement: Placement,
) -> RequestContext {
    RequestContext {
        document_id: input.document.id.clone(),
        document_title: input.document.title.clone(),
        section_id: input.section.id.clone(),
        selection: input.selection,
        selected_text: selected_text(input),
        surrounding_text: surrounding_text(&input.section.text, input.selection),
        original_text,
        target,
        placement,
        instruction: input.instruction().map(str::to_string),
        language: input.language().map(str::to_string),
    }
}

/// Assemble the request: provider hint, `max_words` constraint, and the
/// remaining options as inputs
pub(crate) fn finish_request(
    action_id: &str,
    modalities: Vec<Modality>,
    context: RequestContext,
    input: &ActionInput,
    default_provider_id: Option<&str>,
) -> Result<ActionRequest> {
    let preferred = input
        .option_str(OPTION_PROVIDER)
        .or(default_provider_id)
        .map(str::to_string);

    let mut request = ActionRequest::new(action_id, modalities, context).with_preferred_provider(preferred);

    if let Some(value) = input.options.get(OPTION_MAX_WORDS) {
        match value.as_u64() {
            Some(n) if n > 0 => request = request.with_constraint(OPTION_MAX_WORDS, Value::from(n)),
            _ => {
                return Err(AiError::validation(
                    codes::INVALID_INPUT,
                    format!("max_words must be a positive integer, got {}", value),
                ));
            }
        }
    }

    for (key, value) in &input.options {
        if !RESERVED_OPTIONS.contains(&key.as_str()) {
            request = request.with_input(key.clone(), value.clone());
        }
    }

    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input(text: &str) -> ActionInput {
        ActionInput::new(
            "user-1",
            DocumentRef {
                id: "doc-1".into(),
                title: "Notes".into(),
            },
            SectionRef {
                id: "s-1".into(),
                title: "Intro".into(),
                text: text.into(),
            },
        )
    }

    #[test]
    fn test_with_selection_takes_text_from_section() {
        let input = input("The cat sat.").with_selection(TextRange::new(4, 7));
        assert_eq!(input.selected_text, "cat");
    }

    #[test]
    fn test_validate_selection() {
        let ok = input("The cat sat.").with_selection(TextRange::new(0, 12));
        assert!(validate_selection(&ok, true).is_ok());

        let blank = input("The cat sat.");
        let err = validate_selection(&blank, true).unwrap_err();
        assert_eq!(err.code(), "ai.selection_required");
        assert!(validate_selection(&blank, false).is_ok());

        let mut inverted = input("The cat sat.");
        inverted.selection = TextRange::new(5, 2);
        assert_eq!(validate_selection(&inverted, false).unwrap_err().code(), "ai.invalid_selection");

        let mut outside = input("short");
        outside.selection = TextRange::new(0, 40);
        assert_eq!(validate_selection(&outside, false).unwrap_err().code(), "ai.invalid_selection");
    }

    #[test]
    fn test_whitespace_selection_is_blank() {
        let input = input("a    b").with_selection(TextRange::new(1, 5));
        assert_eq!(validate_selection(&input, true).unwrap_err().code(), "ai.selection_required");
    }

    #[test]
    fn test_range_without_reported_text_is_rejected() {
        let mut input = input("The cat sat.");
        input.selection = TextRange::new(0, 12);
        assert_eq!(validate_selection(&input, true).unwrap_err().code(), "ai.selection_required");
    }

    #[test]
    fn test_caret_with_reported_text_is_rejected() {
        let mut input = input("The cat sat.");
        input.selected_text = "The cat sat.".into();
        assert_eq!(input.selection, TextRange::at(0));
        assert_eq!(validate_selection(&input, true).unwrap_err().code(), "ai.invalid_selection");
    }

    #[test]
    fn test_stale_reported_text_is_rejected() {
        let mut input = input("The cat sat.").with_selection(TextRange::new(4, 7));
        input.selected_text = "dog".into();
        assert_eq!(validate_selection(&input, true).unwrap_err().code(), "ai.invalid_selection");
    }

    #[test]
    fn test_surrounding_text_is_bounded() {
        let text: String = "x".repeat(1000);
        let around = surrounding_text(&text, TextRange::new(500, 510));
        assert_eq!(around.chars().count(), 810);
        assert_eq!(surrounding_text("short", TextRange::new(1, 2)), "short");
    }

    #[test]
    fn test_finish_request_splits_options() {
        let input = input("Hello")
            .with_option("provider", json!("mock-text"))
            .with_option("max_words", json!(12))
            .with_option("tone", json!("formal"));
        let ctx = base_context(&input, String::new(), TextRange::at(5), Placement::SectionEnd);
        let request = finish_request("continue-writing", vec![Modality::Text], ctx, &input, Some("other")).unwrap();

        assert_eq!(request.hints().preferred_provider_id.as_deref(), Some("mock-text"));
        assert_eq!(request.constraint_u64("max_words"), Some(12));
        assert_eq!(request.input_str("tone"), Some("formal"));
        assert!(request.inputs().get("provider").is_none());
    }

    #[test]
    fn test_bad_max_words() {
        let input = input("Hello").with_option("max_words", json!("lots"));
        let ctx = base_context(&input, String::new(), TextRange::at(0), Placement::SectionEnd);
        let err = finish_request("continue-writing", vec![Modality::Text], ctx, &input, None).unwrap_err();
        assert_eq!(err.code(), "ai.invalid_input");
    }

    #[test]
    fn test_placement_option() {
        let i = input("x").with_option("placement", json!("section-start"));
        assert_eq!(placement_option(&i, Placement::SectionEnd).unwrap(), Placement::SectionStart);
        let i = input("x").with_option("placement", json!("middle"));
        assert!(placement_option(&i, Placement::SectionEnd).is_err());
    }
}
