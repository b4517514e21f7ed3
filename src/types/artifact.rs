// src/types/artifact.rs
// Provider output: artifacts, usage accounting and results

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::Modality;
use crate::error::ProviderError;

/// One piece of generated content (a text block, an image, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: String,
    pub modality: Modality,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    /// SHA-256 of the payload, for deduplication
    pub content_hash: String,
}

impl Artifact {
    /// Create a text artifact
    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            id: Uuid::new_v4().to_string(),
            modality: Modality::Text,
            mime_type: "text/plain".to_string(),
            content_hash: hash_bytes(text.as_bytes()),
            text: Some(text),
            data: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Create a binary image artifact
    pub fn image(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            modality: Modality::Image,
            mime_type: mime_type.into(),
            content_hash: hash_bytes(&data),
            text: None,
            data: Some(data),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn is_text(&self) -> bool {
        self.modality == Modality::Text
    }

    pub fn is_image(&self) -> bool {
        self.modality == Modality::Image
    }

    /// Payload size in bytes
    pub fn size(&self) -> usize {
        self.text.as_ref().map(String::len).unwrap_or(0)
            + self.data.as_ref().map(Vec::len).unwrap_or(0)
    }
}

fn hash_bytes(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Token and latency accounting for one provider call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProviderUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub latency_ms: u64,
}

impl ProviderUsage {
    pub fn new(input_tokens: u32, output_tokens: u32, latency_ms: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            latency_ms,
        }
    }

    pub fn total_tokens(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// What a provider returns for one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderResult {
    pub request_id: String,
    pub artifacts: Vec<Artifact>,
    pub usage: ProviderUsage,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl ProviderResult {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            artifacts: Vec::new(),
            usage: ProviderUsage::default(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_artifact(mut self, artifact: Artifact) -> Self {
        self.artifacts.push(artifact);
        self
    }

    pub fn with_usage(mut self, usage: ProviderUsage) -> Self {
        self.usage = usage;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Check the success invariants: answers `request_id`, carries at least one artifact
    pub fn validate(&self, request_id: &str, provider_id: &str) -> Result<(), ProviderError> {
        if self.request_id != request_id {
            return Err(ProviderError::new(
                provider_id,
                format!(
                    "result answers request {} but {} was sent",
                    self.request_id, request_id
                ),
            ));
        }
        if self.artifacts.is_empty() {
            return Err(ProviderError::new(provider_id, "provider returned no artifacts"));
        }
        Ok(())
    }

    pub fn text_artifacts(&self) -> impl Iterator<Item = &Artifact> {
        self.artifacts.iter().filter(|a| a.is_text())
    }

    pub fn image_artifacts(&self) -> impl Iterator<Item = &Artifact> {
        self.artifacts.iter().filter(|a| a.is_image())
    }

    /// All text artifacts joined in order
    pub fn combined_text(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .text_artifacts()
            .filter_map(|a| a.text.as_deref())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.concat())
        }
    }
}
