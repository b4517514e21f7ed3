// src/types/proposal.rs
// Staged, reviewable results of an AI action

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use similar::TextDiff;
use std::fmt;

use super::TextRange;

/// Where an attached artifact should land in the section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    #[default]
    AfterSelection,
    SectionStart,
    SectionEnd,
    Cover,
}

impl Placement {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "after_selection" | "after-selection" => Some(Self::AfterSelection),
            "section_start" | "section-start" => Some(Self::SectionStart),
            "section_end" | "section-end" => Some(Self::SectionEnd),
            "cover" => Some(Self::Cover),
            _ => None,
        }
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AfterSelection => write!(f, "after_selection"),
            Self::SectionStart => write!(f, "section_start"),
            Self::SectionEnd => write!(f, "section_end"),
            Self::Cover => write!(f, "cover"),
        }
    }
}

/// One staged mutation inside a proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProposedOperation {
    ReplaceTextRange {
        section_id: String,
        range: TextRange,
        new_text: String,
    },
    AttachArtifact {
        section_id: String,
        artifact_id: String,
        placement: Placement,
    },
}

impl ProposedOperation {
    pub fn section_id(&self) -> &str {
        match self {
            Self::ReplaceTextRange { section_id, .. } | Self::AttachArtifact { section_id, .. } => {
                section_id
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::ReplaceTextRange { range, new_text, .. } if range.is_empty() => {
                format!("insert {} chars at {}", new_text.chars().count(), range.start)
            }
            Self::ReplaceTextRange { range, new_text, .. } => format!(
                "replace {} with {} chars",
                range,
                new_text.chars().count()
            ),
            Self::AttachArtifact {
                artifact_id,
                placement,
                ..
            } => format!("attach artifact {} ({})", artifact_id, placement),
        }
    }
}

/// How much of the document a proposal touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalScope {
    Selection,
    Section,
    Document,
}

impl fmt::Display for ProposalScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Selection => write!(f, "selection"),
            Self::Section => write!(f, "section"),
            Self::Document => write!(f, "document"),
        }
    }
}

/// Reviewable output of an action. Never applied automatically; see
/// [`crate::applier::ProposalApplier`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: String,
    pub section_id: String,
    /// Short label for the review UI
    pub label: String,
    pub action_id: String,
    pub provider_id: String,
    pub request_id: String,
    pub created_at: DateTime<Utc>,
    pub reason: Option<String>,
    pub operations: Vec<ProposedOperation>,
    pub artifact_ids: Vec<String>,
    pub summary: String,
    pub scope: ProposalScope,
    pub original_text: Option<String>,
    pub proposed_text: Option<String>,
    pub was_fallback_used: bool,
    pub route_reason: String,
}

impl Proposal {
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Unified diff of the original and proposed text, if both are known
    pub fn diff_preview(&self) -> Option<String> {
        let original = self.original_text.as_deref()?;
        let proposed = self.proposed_text.as_deref()?;
        let diff = TextDiff::from_lines(original, proposed);
        Some(
            diff.unified_diff()
                .context_radius(3)
                .header("original", "proposed")
                .to_string(),
        )
    }
}
