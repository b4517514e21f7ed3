// src/usage/mod.rs
// Usage and entitlement gating ahead of provider calls

mod memory;

pub use memory::{Entitlement, InMemoryUsageService, UsageTotals};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::codes;

/// What the gate asks the usage service about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageQuery {
    pub provider_id: String,
    pub action_id: String,
    pub caller_id: String,
    /// Whether the chosen provider bills against quota
    pub billable: bool,
}

/// Allow or deny, with a code and message on denial
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageDecision {
    pub allowed: bool,
    pub caller_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl UsageDecision {
    pub fn allow(caller_id: impl Into<String>) -> Self {
        Self {
            allowed: true,
            caller_id: caller_id.into(),
            code: None,
            message: None,
        }
    }

    pub fn deny(caller_id: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            allowed: false,
            caller_id: caller_id.into(),
            code: Some(code.into()),
            message: Some(message.into()),
        }
    }

    /// Denial code, defaulting to `ai.disabled` when the service gave none
    pub fn denial_code(&self) -> &str {
        self.code.as_deref().unwrap_or(codes::DISABLED)
    }

    pub fn denial_message(&self) -> &str {
        self.message.as_deref().unwrap_or("AI usage denied")
    }
}

/// One successful execution, as recorded for accounting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageEvent {
    pub caller_id: String,
    pub provider_id: String,
    pub action_id: String,
    pub request_id: String,
    pub document_id: String,
    pub section_id: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub latency_ms: u64,
    pub billable: bool,
    pub timestamp: DateTime<Utc>,
}

impl UsageEvent {
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens as u64 + self.output_tokens as u64
    }
}

/// External usage / entitlement service
#[async_trait]
pub trait UsageService: Send + Sync {
    async fn evaluate_usage(&self, query: &UsageQuery) -> Result<UsageDecision>;

    async fn record_usage(&self, event: UsageEvent) -> Result<()>;
}

/// Pre-call gate: global switch first, then the usage service
#[derive(Clone)]
pub struct UsageGate {
    enabled: bool,
    service: Arc<dyn UsageService>,
}

impl UsageGate {
    pub fn new(enabled: bool, service: Arc<dyn UsageService>) -> Self {
        Self { enabled, service }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Decide whether `query` may proceed. Denials are values; a failing
    /// service becomes an `ai.usage_unavailable` denial.
    pub async fn evaluate(&self, query: &UsageQuery) -> UsageDecision {
        if !self.enabled {
            info!(caller = %query.caller_id, action = %query.action_id, "AI features disabled");
            return UsageDecision::deny(
                &query.caller_id,
                codes::DISABLED,
                "AI features are disabled",
            );
        }

        match self.service.evaluate_usage(query).await {
            Ok(decision) => {
                if decision.allowed {
                    debug!(
                        caller = %decision.caller_id,
                        provider = %query.provider_id,
                        action = %query.action_id,
                        billable = query.billable,
                        "Usage allowed"
                    );
                } else {
                    info!(
                        caller = %decision.caller_id,
                        provider = %query.provider_id,
                        action = %query.action_id,
                        code = %decision.denial_code(),
                        "Usage denied"
                    );
                }
                decision
            }
            Err(e) => {
                error!(caller = %query.caller_id, error = %e, "Usage service unavailable");
                UsageDecision::deny(
                    &query.caller_id,
                    codes::USAGE_UNAVAILABLE,
                    format!("usage service unavailable: {}", e),
                )
            }
        }
    }

    /// Record a successful execution. Failures are logged, never surfaced.
    pub async fn record(&self, event: UsageEvent) {
        let request_id = event.request_id.clone();
        match self.service.record_usage(event).await {
            Ok(()) => debug!(request_id = %request_id, "Usage recorded"),
            Err(e) => warn!(request_id = %request_id, error = %e, "Failed to record usage"),
        }
    }
}
