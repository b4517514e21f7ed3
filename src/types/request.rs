// src/types/request.rs
// Action requests: what an action asks a provider to do

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use super::Placement;

/// Kind of content an action or provider deals in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Text,
    Image,
}

impl Modality {
    /// Parse modality from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(Self::Text),
            "image" => Some(Self::Image),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Half-open range of character offsets into a section's text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Empty range at `offset` (an insertion point)
    pub fn at(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_valid(&self) -> bool {
        self.start <= self.end
    }

    /// Whether the range fits inside a text of `char_len` characters
    pub fn fits(&self, char_len: usize) -> bool {
        self.is_valid() && self.end <= char_len
    }

    /// Byte range of this char range within `text`, if it fits
    pub fn byte_range(&self, text: &str) -> Option<std::ops::Range<usize>> {
        if !self.is_valid() {
            return None;
        }
        let mut start = None;
        let mut end = None;
        for (count, (byte_idx, _)) in text.char_indices().enumerate() {
            if count == self.start {
                start = Some(byte_idx);
            }
            if count == self.end {
                end = Some(byte_idx);
                break;
            }
        }
        let char_len = text.chars().count();
        if self.start == char_len {
            start = Some(text.len());
        }
        if self.end == char_len {
            end = Some(text.len());
        }
        Some(start?..end?)
    }

    /// Slice of `text` covered by this range
    pub fn slice<'a>(&self, text: &'a str) -> Option<&'a str> {
        self.byte_range(text).map(|r| &text[r])
    }
}

impl fmt::Display for TextRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Where in the document a request applies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub document_id: String,
    pub document_title: String,
    pub section_id: String,
    pub selection: TextRange,
    pub selected_text: String,
    /// Text around the selection, for provider context
    pub surrounding_text: String,
    /// Text the result will replace (empty for insertions)
    pub original_text: String,
    /// Range a text result replaces
    pub target: TextRange,
    pub placement: Placement,
    pub instruction: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProviderHints {
    pub preferred_provider_id: Option<String>,
}

/// Immutable request handed to a provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRequest {
    request_id: String,
    created_at: DateTime<Utc>,
    action_id: String,
    modalities: Vec<Modality>,
    context: RequestContext,
    inputs: BTreeMap<String, Value>,
    constraints: BTreeMap<String, Value>,
    hints: ProviderHints,
}

impl ActionRequest {
    pub fn new(action_id: impl Into<String>, modalities: Vec<Modality>, context: RequestContext) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            action_id: action_id.into(),
            modalities,
            context,
            inputs: BTreeMap::new(),
            constraints: BTreeMap::new(),
            hints: ProviderHints::default(),
        }
    }

    pub fn with_input(mut self, key: impl Into<String>, value: Value) -> Self {
        self.inputs.insert(key.into(), value);
        self
    }

    pub fn with_constraint(mut self, key: impl Into<String>, value: Value) -> Self {
        self.constraints.insert(key.into(), value);
        self
    }

    pub fn with_preferred_provider(mut self, provider_id: Option<String>) -> Self {
        self.hints.preferred_provider_id = provider_id;
        self
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn action_id(&self) -> &str {
        &self.action_id
    }

    pub fn modalities(&self) -> &[Modality] {
        &self.modalities
    }

    /// Modality used for routing: the first one the action declared
    pub fn primary_modality(&self) -> Modality {
        self.modalities.first().copied().unwrap_or(Modality::Text)
    }

    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    pub fn inputs(&self) -> &BTreeMap<String, Value> {
        &self.inputs
    }

    pub fn constraints(&self) -> &BTreeMap<String, Value> {
        &self.constraints
    }

    pub fn hints(&self) -> &ProviderHints {
        &self.hints
    }

    pub fn input_str(&self, key: &str) -> Option<&str> {
        self.inputs.get(key).and_then(Value::as_str)
    }

    pub fn constraint_u64(&self, key: &str) -> Option<u64> {
        self.constraints.get(key).and_then(Value::as_u64)
    }

    /// Same request apart from the fresh id and timestamp
    pub fn same_intent(&self, other: &ActionRequest) -> bool {
        self.action_id == other.action_id
            && self.modalities == other.modalities
            && self.context == other.context
            && self.inputs == other.inputs
            && self.constraints == other.constraints
            && self.hints == other.hints
    }
}
