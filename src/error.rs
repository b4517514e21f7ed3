// src/error.rs
// Error taxonomy for the AI action pipeline

use crate::types::Modality;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable error codes surfaced to the UI layer
pub mod codes {
    pub const SELECTION_REQUIRED: &str = "ai.selection_required";
    pub const INVALID_SELECTION: &str = "ai.invalid_selection";
    pub const LANGUAGE_REQUIRED: &str = "ai.language_required";
    pub const INVALID_INPUT: &str = "ai.invalid_input";
    pub const DISABLED: &str = "ai.disabled";
    pub const QUOTA_EXCEEDED: &str = "ai.quota_exceeded";
    pub const USAGE_UNAVAILABLE: &str = "ai.usage_unavailable";
    pub const NO_PROVIDER: &str = "ai.no_provider";
    pub const FALLBACK_DISABLED: &str = "ai.fallback_disabled";
    pub const PROVIDER_ERROR: &str = "ai.provider_error";
    pub const ARTIFACT_STORE_FAILED: &str = "ai.artifact_store_failed";
    pub const ACTION_NOT_FOUND: &str = "ai.action_not_found";
    pub const STREAMING_DISABLED: &str = "ai.streaming_disabled";
    pub const DUPLICATE_PROVIDER: &str = "ai.duplicate_provider";
    pub const CONFIG: &str = "ai.config";
    pub const CANCELLED: &str = "ai.cancelled";
}

/// Which stage of the pipeline produced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Policy,
    Routing,
    Provider,
    Storage,
    Cancelled,
    Internal,
}

/// Failure raised by a provider. Always names the provider that failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("provider '{provider_id}' failed: {message}")]
pub struct ProviderError {
    pub provider_id: String,
    pub message: String,
}

impl ProviderError {
    pub fn new(provider_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            message: message.into(),
        }
    }
}

/// Main error type for the orchestration core
#[derive(Error, Debug)]
pub enum AiError {
    #[error("{message}")]
    Validation { code: &'static str, message: String },

    #[error("{message}")]
    PolicyDenied { code: String, message: String },

    #[error("no provider available for {modality} generation{}", streaming_suffix(.streaming))]
    NoCapableProvider { modality: Modality, streaming: bool },

    #[error("{}", fallback_disabled_message(.preferred, .modality, .streaming))]
    FallbackDisabled {
        preferred: Option<String>,
        modality: Modality,
        streaming: bool,
    },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("artifact store error: {0}")]
    ArtifactStore(String),

    #[error("unknown action: {0}")]
    ActionNotFound(String),

    #[error("provider '{0}' is already registered")]
    DuplicateProvider(String),

    #[error("streaming is disabled")]
    StreamingDisabled,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("operation cancelled")]
    Cancelled,
}

/// Convenience type alias for Result using AiError
pub type Result<T, E = AiError> = std::result::Result<T, E>;

fn streaming_suffix(streaming: &bool) -> &'static str {
    if *streaming { " with streaming" } else { "" }
}

fn fallback_disabled_message(
    preferred: &Option<String>,
    modality: &Modality,
    streaming: &bool,
) -> String {
    match preferred {
        Some(id) => format!(
            "provider '{}' cannot serve {} generation{} and provider fallback is disabled",
            id,
            modality,
            streaming_suffix(streaming)
        ),
        None => format!(
            "no default {} provider configured and provider fallback is disabled",
            modality
        ),
    }
}

impl AiError {
    pub fn validation(code: &'static str, message: impl Into<String>) -> Self {
        AiError::Validation {
            code,
            message: message.into(),
        }
    }

    pub fn denied(code: impl Into<String>, message: impl Into<String>) -> Self {
        AiError::PolicyDenied {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Stable code for the UI layer
    pub fn code(&self) -> &str {
        match self {
            AiError::Validation { code, .. } => code,
            AiError::PolicyDenied { code, .. } => code,
            AiError::NoCapableProvider { .. } => codes::NO_PROVIDER,
            AiError::FallbackDisabled { .. } => codes::FALLBACK_DISABLED,
            AiError::Provider(_) => codes::PROVIDER_ERROR,
            AiError::ArtifactStore(_) => codes::ARTIFACT_STORE_FAILED,
            AiError::ActionNotFound(_) => codes::ACTION_NOT_FOUND,
            AiError::DuplicateProvider(_) => codes::DUPLICATE_PROVIDER,
            AiError::StreamingDisabled => codes::STREAMING_DISABLED,
            AiError::Config(_) => codes::CONFIG,
            AiError::Cancelled => codes::CANCELLED,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AiError::Validation { .. } | AiError::ActionNotFound(_) => ErrorKind::Validation,
            AiError::PolicyDenied { .. } | AiError::StreamingDisabled => ErrorKind::Policy,
            AiError::NoCapableProvider { .. } | AiError::FallbackDisabled { .. } => {
                ErrorKind::Routing
            }
            AiError::Provider(_) => ErrorKind::Provider,
            AiError::ArtifactStore(_) => ErrorKind::Storage,
            AiError::Cancelled => ErrorKind::Cancelled,
            AiError::DuplicateProvider(_) | AiError::Config(_) => ErrorKind::Internal,
        }
    }

    /// Provider that failed, when the error came from one
    pub fn provider_id(&self) -> Option<&str> {
        match self {
            AiError::Provider(err) => Some(&err.provider_id),
            _ => None,
        }
    }
}
