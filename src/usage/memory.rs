// src/usage/memory.rs
// In-process usage service with per-caller monthly quotas

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

use super::{UsageDecision, UsageEvent, UsageQuery, UsageService};
use crate::error::codes;

/// What a caller is allowed to use per period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entitlement {
    pub ai_enabled: bool,
    pub max_requests: Option<u64>,
    pub max_tokens: Option<u64>,
}

impl Default for Entitlement {
    fn default() -> Self {
        Self {
            ai_enabled: true,
            max_requests: None,
            max_tokens: None,
        }
    }
}

impl Entitlement {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn disabled() -> Self {
        Self {
            ai_enabled: false,
            ..Self::default()
        }
    }

    pub fn with_max_requests(mut self, max: u64) -> Self {
        self.max_requests = Some(max);
        self
    }

    pub fn with_max_tokens(mut self, max: u64) -> Self {
        self.max_tokens = Some(max);
        self
    }
}

/// Billable usage accumulated for one caller in one period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UsageTotals {
    pub requests: u64,
    pub tokens: u64,
}

#[derive(Default)]
struct State {
    entitlements: HashMap<String, Entitlement>,
    totals: HashMap<(String, String), UsageTotals>,
    events: Vec<UsageEvent>,
}

/// Usage service backed by process memory.
///
/// Aggregates are keyed by `(caller, "YYYY-MM")` and updated under one lock,
/// so concurrent records never lose updates.
///
/// Quotas are soft: `evaluate_usage` reserves nothing, so callers evaluated
/// concurrently at `max - 1` may all proceed and overrun the limit by the
/// number of in-flight requests. Later calls are denied once the records land.
pub struct InMemoryUsageService {
    default_entitlement: Entitlement,
    state: Mutex<State>,
}

impl Default for InMemoryUsageService {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryUsageService {
    /// Every caller unlimited unless configured otherwise
    pub fn new() -> Self {
        Self::with_default_entitlement(Entitlement::unlimited())
    }

    pub fn with_default_entitlement(entitlement: Entitlement) -> Self {
        Self {
            default_entitlement: entitlement,
            state: Mutex::new(State::default()),
        }
    }

    pub async fn set_entitlement(&self, caller_id: impl Into<String>, entitlement: Entitlement) {
        self.state
            .lock()
            .await
            .entitlements
            .insert(caller_id.into(), entitlement);
    }

    /// Totals for `caller_id` in the current period
    pub async fn totals(&self, caller_id: &str) -> UsageTotals {
        let key = (caller_id.to_string(), period(Utc::now()));
        self.state
            .lock()
            .await
            .totals
            .get(&key)
            .copied()
            .unwrap_or_default()
    }

    /// Every recorded event, oldest first
    pub async fn events(&self) -> Vec<UsageEvent> {
        self.state.lock().await.events.clone()
    }

    pub async fn event_count(&self) -> usize {
        self.state.lock().await.events.len()
    }
}

fn period(at: DateTime<Utc>) -> String {
    at.format("%Y-%m").to_string()
}

#[async_trait]
impl UsageService for InMemoryUsageService {
    async fn evaluate_usage(&self, query: &UsageQuery) -> Result<UsageDecision> {
        let state = self.state.lock().await;
        let entitlement = state
            .entitlements
            .get(&query.caller_id)
            .unwrap_or(&self.default_entitlement);

        if !entitlement.ai_enabled {
            return Ok(UsageDecision::deny(
                &query.caller_id,
                codes::DISABLED,
                "AI features are disabled for this account",
            ));
        }

        // Non-billable providers do not count against quota
        if !query.billable {
            return Ok(UsageDecision::allow(&query.caller_id));
        }

        let key = (query.caller_id.clone(), period(Utc::now()));
        let totals = state.totals.get(&key).copied().unwrap_or_default();

        if entitlement.max_requests.is_some_and(|max| totals.requests >= max) {
            return Ok(UsageDecision::deny(
                &query.caller_id,
                codes::QUOTA_EXCEEDED,
                "AI request quota exceeded for this month",
            ));
        }
        if entitlement.max_tokens.is_some_and(|max| totals.tokens >= max) {
            return Ok(UsageDecision::deny(
                &query.caller_id,
                codes::QUOTA_EXCEEDED,
                "AI token quota exceeded for this month",
            ));
        }

        Ok(UsageDecision::allow(&query.caller_id))
    }

    async fn record_usage(&self, event: UsageEvent) -> Result<()> {
        let mut state = self.state.lock().await;

        if event.billable {
            let key = (event.caller_id.clone(), period(event.timestamp));
            let totals = state.totals.entry(key).or_default();
            totals.requests += 1;
            totals.tokens += event.total_tokens();
            debug!(
                caller = %event.caller_id,
                requests = totals.requests,
                tokens = totals.tokens,
                "Updated usage totals"
            );
        }

        state.events.push(event);
        Ok(())
    }
}
