// src/pipeline.rs
// Stages shared by blocking and streaming execution

use chrono::Utc;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::actions::{ActionInput, AiAction};
use crate::artifacts::ArtifactStore;
use crate::error::{AiError, Result, codes};
use crate::mapping::{MappedOutput, to_proposal};
use crate::router::{ProviderRouter, RouteDecision};
use crate::types::{ActionRequest, Artifact, Proposal, ProviderUsage};
use crate::usage::{UsageEvent, UsageGate, UsageQuery};

/// A built, routed and admitted request, ready for the provider
#[derive(Debug, Clone)]
pub struct Prepared {
    pub request: ActionRequest,
    pub route: RouteDecision,
}

/// Gate, router and artifact store wired together
pub struct ExecutionPipeline {
    router: ProviderRouter,
    gate: UsageGate,
    artifacts: Arc<dyn ArtifactStore>,
}

pub(crate) fn ensure_active(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(AiError::Cancelled)
    } else {
        Ok(())
    }
}

impl ExecutionPipeline {
    pub fn new(router: ProviderRouter, gate: UsageGate, artifacts: Arc<dyn ArtifactStore>) -> Self {
        Self {
            router,
            gate,
            artifacts,
        }
    }

    pub fn router(&self) -> &ProviderRouter {
        &self.router
    }

    pub fn artifacts(&self) -> &Arc<dyn ArtifactStore> {
        &self.artifacts
    }

    /// Build the request, check the global switch, route, then ask the usage
    /// gate. Nothing billable has happened when this returns.
    pub async fn prepare(
        &self,
        action: &dyn AiAction,
        input: &ActionInput,
        streaming: bool,
        cancel: &CancellationToken,
    ) -> Result<Prepared> {
        ensure_active(cancel)?;
        let request = action.build_request(input)?;
        debug!(
            request_id = %request.request_id(),
            action = %action.id(),
            streaming,
            "Built request"
        );

        ensure_active(cancel)?;
        if !self.gate.is_enabled() {
            return Err(AiError::denied(codes::DISABLED, "AI features are disabled"));
        }

        let route = self.router.route(
            action.primary_modality(),
            streaming,
            request.hints().preferred_provider_id.as_deref(),
        )?;

        ensure_active(cancel)?;
        let decision = self
            .gate
            .evaluate(&UsageQuery {
                provider_id: route.provider_id.clone(),
                action_id: action.id().to_string(),
                caller_id: input.caller_id.clone(),
                billable: route.provider.capabilities().billable,
            })
            .await;
        if !decision.allowed {
            return Err(AiError::denied(decision.denial_code(), decision.denial_message()));
        }

        ensure_active(cancel)?;
        Ok(Prepared { request, route })
    }

    /// Register one artifact with the store
    pub async fn store_artifact(&self, artifact: Artifact) -> Result<String> {
        self.artifacts
            .store(artifact)
            .await
            .map_err(|e| AiError::ArtifactStore(e.to_string()))
    }

    pub async fn store_artifacts(&self, artifacts: Vec<Artifact>) -> Result<Vec<String>> {
        let mut ids = Vec::with_capacity(artifacts.len());
        for artifact in artifacts {
            ids.push(self.store_artifact(artifact).await?);
        }
        Ok(ids)
    }

    /// Map the output into a proposal and record usage exactly once
    pub async fn finish(
        &self,
        action: &dyn AiAction,
        input: &ActionInput,
        prepared: &Prepared,
        output: MappedOutput,
        usage: ProviderUsage,
    ) -> Proposal {
        let proposal = to_proposal(action, &prepared.request, &prepared.route, output);
        let ctx = prepared.request.context();

        self.gate
            .record(UsageEvent {
                caller_id: input.caller_id.clone(),
                provider_id: prepared.route.provider_id.clone(),
                action_id: action.id().to_string(),
                request_id: prepared.request.request_id().to_string(),
                document_id: ctx.document_id.clone(),
                section_id: ctx.section_id.clone(),
                input_tokens: usage.input_tokens,
                output_tokens: usage.output_tokens,
                latency_ms: usage.latency_ms,
                billable: prepared.route.provider.capabilities().billable,
                timestamp: Utc::now(),
            })
            .await;

        info!(
            request_id = %proposal.request_id,
            proposal_id = %proposal.id,
            action = %proposal.action_id,
            provider = %proposal.provider_id,
            fallback = proposal.was_fallback_used,
            operations = proposal.operations.len(),
            "Proposal ready"
        );
        proposal
    }
}
