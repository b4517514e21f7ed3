// src/applier.rs
// Applies an accepted proposal to a document, one operation at a time

use anyhow::{Result as AnyResult, anyhow, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::actions::{ActionInput, DocumentRef, SectionRef};
use crate::artifacts::ArtifactStore;
use crate::types::{Artifact, Placement, Proposal, ProposedOperation, TextRange};

/// Where accepted mutations go (the editor's document model)
#[async_trait]
pub trait DocumentMutationSink: Send {
    async fn replace_text(&mut self, section_id: &str, range: TextRange, new_text: &str) -> AnyResult<()>;

    async fn attach_artifact(
        &mut self,
        section_id: &str,
        artifact: &Artifact,
        placement: Placement,
    ) -> AnyResult<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyReport {
    pub proposal_id: String,
    pub applied: usize,
}

/// First failed operation; everything before it was applied
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("operation {index} ({operation}) of proposal {proposal_id} failed after {applied} applied: {message}")]
pub struct ApplyError {
    pub proposal_id: String,
    pub index: usize,
    pub operation: String,
    pub applied: usize,
    pub message: String,
}

pub struct ProposalApplier {
    artifacts: Arc<dyn ArtifactStore>,
}

impl ProposalApplier {
    pub fn new(artifacts: Arc<dyn ArtifactStore>) -> Self {
        Self { artifacts }
    }

    /// Apply every operation in order. Stops at the first failure; no retries.
    pub async fn apply(
        &self,
        proposal: &Proposal,
        sink: &mut dyn DocumentMutationSink,
    ) -> Result<ApplyReport, ApplyError> {
        for (index, operation) in proposal.operations.iter().enumerate() {
            if let Err(e) = self.apply_one(operation, sink).await {
                warn!(
                    proposal_id = %proposal.id,
                    index,
                    operation = %operation.describe(),
                    error = %e,
                    "Failed to apply operation"
                );
                return Err(ApplyError {
                    proposal_id: proposal.id.clone(),
                    index,
                    operation: operation.describe(),
                    applied: index,
                    message: e.to_string(),
                });
            }
            debug!(proposal_id = %proposal.id, index, "Applied operation");
        }

        info!(
            proposal_id = %proposal.id,
            applied = proposal.operations.len(),
            "Proposal applied"
        );
        Ok(ApplyReport {
            proposal_id: proposal.id.clone(),
            applied: proposal.operations.len(),
        })
    }

    async fn apply_one(
        &self,
        operation: &ProposedOperation,
        sink: &mut dyn DocumentMutationSink,
    ) -> AnyResult<()> {
        match operation {
            ProposedOperation::ReplaceTextRange {
                section_id,
                range,
                new_text,
            } => sink.replace_text(section_id, *range, new_text).await,
            ProposedOperation::AttachArtifact {
                section_id,
                artifact_id,
                placement,
            } => {
                let artifact = self
                    .artifacts
                    .get(artifact_id)
                    .await?
                    .ok_or_else(|| anyhow!("artifact {} not found", artifact_id))?;
                sink.attach_artifact(section_id, &artifact, *placement).await
            }
        }
    }
}

/// An attachment recorded by [`InMemoryDocument`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub artifact_id: String,
    pub mime_type: String,
    pub placement: Placement,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSection {
    pub id: String,
    pub title: String,
    pub text: String,
    pub attachments: Vec<Attachment>,
}

/// Minimal document model, used by the CLI and tests
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InMemoryDocument {
    pub id: String,
    pub title: String,
    pub sections: Vec<DocumentSection>,
    pub cover: Option<Attachment>,
}

impl InMemoryDocument {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_section(mut self, id: impl Into<String>, title: impl Into<String>, text: impl Into<String>) -> Self {
        self.sections.push(DocumentSection {
            id: id.into(),
            title: title.into(),
            text: text.into(),
            attachments: Vec::new(),
        });
        self
    }

    pub fn section(&self, id: &str) -> Option<&DocumentSection> {
        self.sections.iter().find(|s| s.id == id)
    }

    pub fn section_text(&self, id: &str) -> Option<&str> {
        self.section(id).map(|s| s.text.as_str())
    }

    fn section_mut(&mut self, id: &str) -> AnyResult<&mut DocumentSection> {
        self.sections
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| anyhow!("section {} not found", id))
    }

    /// Action input for `section_id` as it currently stands
    pub fn input_for(&self, caller_id: &str, section_id: &str) -> Option<ActionInput> {
        let section = self.section(section_id)?;
        Some(ActionInput::new(
            caller_id,
            DocumentRef {
                id: self.id.clone(),
                title: self.title.clone(),
            },
            SectionRef {
                id: section.id.clone(),
                title: section.title.clone(),
                text: section.text.clone(),
            },
        ))
    }
}

#[async_trait]
impl DocumentMutationSink for InMemoryDocument {
    async fn replace_text(&mut self, section_id: &str, range: TextRange, new_text: &str) -> AnyResult<()> {
        let section = self.section_mut(section_id)?;
        let Some(bytes) = range.byte_range(&section.text) else {
            bail!(
                "range {} is outside section {} ({} chars)",
                range,
                section_id,
                section.text.chars().count()
            );
        };
        section.text.replace_range(bytes, new_text);
        Ok(())
    }

    async fn attach_artifact(
        &mut self,
        section_id: &str,
        artifact: &Artifact,
        placement: Placement,
    ) -> AnyResult<()> {
        let attachment = Attachment {
            artifact_id: artifact.id.clone(),
            mime_type: artifact.mime_type.clone(),
            placement,
        };
        if placement == Placement::Cover {
            self.cover = Some(attachment);
            return Ok(());
        }
        self.section_mut(section_id)?.attachments.push(attachment);
        Ok(())
    }
}
