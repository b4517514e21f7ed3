// src/types/outcome.rs
// Discriminated result of one execution

use serde::{Deserialize, Serialize};

use super::Proposal;
use crate::error::{AiError, ErrorKind};

/// Typed refusal: code + message for the UI, never a Proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub kind: ErrorKind,
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
}

impl From<&AiError> for Rejection {
    fn from(err: &AiError) -> Self {
        Self {
            kind: err.kind(),
            code: err.code().to_string(),
            message: err.to_string(),
            provider_id: err.provider_id().map(str::to_string),
        }
    }
}

/// Outcome of a blocking execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionResult {
    /// Provider output staged as a proposal
    Success(Proposal),
    /// Stopped before any provider call (validation, policy, routing)
    Blocked(Rejection),
    /// The provider call, or handling its output, failed
    Failed(Rejection),
    /// Caller cancelled
    Cancelled,
}

impl ExecutionResult {
    /// Classify a pipeline error
    pub fn from_error(err: &AiError) -> Self {
        match err.kind() {
            ErrorKind::Cancelled => ExecutionResult::Cancelled,
            ErrorKind::Provider | ErrorKind::Storage | ErrorKind::Internal => {
                ExecutionResult::Failed(Rejection::from(err))
            }
            ErrorKind::Validation | ErrorKind::Policy | ErrorKind::Routing => {
                ExecutionResult::Blocked(Rejection::from(err))
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionResult::Success(_))
    }

    pub fn proposal(&self) -> Option<&Proposal> {
        match self {
            ExecutionResult::Success(proposal) => Some(proposal),
            _ => None,
        }
    }

    pub fn into_proposal(self) -> Option<Proposal> {
        match self {
            ExecutionResult::Success(proposal) => Some(proposal),
            _ => None,
        }
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            ExecutionResult::Blocked(r) | ExecutionResult::Failed(r) => Some(r),
            _ => None,
        }
    }

    /// Error code for anything but success
    pub fn error_code(&self) -> Option<&str> {
        match self {
            ExecutionResult::Success(_) => None,
            ExecutionResult::Blocked(r) | ExecutionResult::Failed(r) => Some(&r.code),
            ExecutionResult::Cancelled => Some(crate::error::codes::CANCELLED),
        }
    }
}
