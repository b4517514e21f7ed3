// src/executor.rs
// Blocking execution: build, gate, route, invoke, map

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::actions::{ActionInput, AiAction};
use crate::error::{AiError, Result};
use crate::mapping::MappedOutput;
use crate::pipeline::{ExecutionPipeline, ensure_active};
use crate::types::{ExecutionResult, Proposal};

/// Runs one action to a single [`ExecutionResult`]
#[derive(Clone)]
pub struct ActionExecutor {
    pipeline: Arc<ExecutionPipeline>,
}

impl ActionExecutor {
    pub fn new(pipeline: Arc<ExecutionPipeline>) -> Self {
        Self { pipeline }
    }

    /// Execute `action`. Never fails: every error becomes a typed outcome.
    #[instrument(skip_all, fields(action = %action.id(), caller = %input.caller_id))]
    pub async fn execute(
        &self,
        action: &dyn AiAction,
        input: &ActionInput,
        cancel: &CancellationToken,
    ) -> ExecutionResult {
        match self.run(action, input, cancel).await {
            Ok(proposal) => ExecutionResult::Success(proposal),
            Err(e) => {
                let result = ExecutionResult::from_error(&e);
                match &result {
                    ExecutionResult::Cancelled => info!("Execution cancelled"),
                    _ => warn!(code = %e.code(), error = %e, "Execution rejected"),
                }
                result
            }
        }
    }

    async fn run(
        &self,
        action: &dyn AiAction,
        input: &ActionInput,
        cancel: &CancellationToken,
    ) -> Result<Proposal> {
        let prepared = self.pipeline.prepare(action, input, false, cancel).await?;
        let provider = prepared.route.provider.clone();
        let request_id = prepared.request.request_id();

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AiError::Cancelled),
            result = provider.execute(&prepared.request, cancel.child_token()) => result,
        };
        let result = match result {
            Ok(result) => result,
            Err(_) if cancel.is_cancelled() => return Err(AiError::Cancelled),
            Err(e) => return Err(e.into()),
        };
        result.validate(request_id, provider.id())?;

        ensure_active(cancel)?;
        let text = result.combined_text();
        let artifact_ids = self
            .pipeline
            .store_artifacts(result.image_artifacts().cloned().collect())
            .await?;

        ensure_active(cancel)?;
        Ok(self
            .pipeline
            .finish(
                action,
                input,
                &prepared,
                MappedOutput { text, artifact_ids },
                result.usage,
            )
            .await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{DocumentRef, GenerateCoverImage, RewriteSelection, SectionRef};
    use crate::artifacts::{ArtifactStore, InMemoryArtifactStore};
    use crate::error::ErrorKind;
    use crate::providers::{MockImageProvider, MockTextProvider, ProviderRegistry};
    use crate::router::{ProviderRouter, RoutingPolicy};
    use crate::types::{Artifact, TextRange};
    use crate::usage::{InMemoryUsageService, UsageGate};
    use async_trait::async_trait;
    use std::time::Duration;

    struct FullDisk;

    #[async_trait]
    impl ArtifactStore for FullDisk {
        async fn store(&self, _artifact: Artifact) -> anyhow::Result<String> {
            anyhow::bail!("disk full")
        }

        async fn get(&self, _id: &str) -> anyhow::Result<Option<Artifact>> {
            Ok(None)
        }
    }

    fn executor(
        text: Arc<MockTextProvider>,
        usage: Arc<InMemoryUsageService>,
        store: Arc<dyn ArtifactStore>,
    ) -> ActionExecutor {
        let registry = ProviderRegistry::new()
            .with(text)
            .unwrap()
            .with(Arc::new(MockImageProvider::new("mock-image")))
            .unwrap();
        let router = ProviderRouter::new(
            Arc::new(registry),
            RoutingPolicy {
                default_text_provider_id: Some("mock-text".into()),
                default_image_provider_id: Some("mock-image".into()),
                allow_fallback: true,
            },
        );
        let pipeline = ExecutionPipeline::new(router, UsageGate::new(true, usage), store);
        ActionExecutor::new(Arc::new(pipeline))
    }

    fn input() -> ActionInput {
        ActionInput::new(
            "user-1",
            DocumentRef {
                id: "doc".into(),
                title: "Tides".into(),
            },
            SectionRef {
                id: "s-1".into(),
                title: String::new(),
                text: "The cat sat.".into(),
            },
        )
        .with_selection(TextRange::new(0, 12))
    }

    #[tokio::test]
    async fn test_cancelled_before_start_never_calls_provider() {
        let text = Arc::new(MockTextProvider::new("mock-text"));
        let usage = Arc::new(InMemoryUsageService::new());
        let executor = executor(text.clone(), usage.clone(), Arc::new(InMemoryArtifactStore::new()));

        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = executor.execute(&RewriteSelection::new(), &input(), &cancel).await;

        assert_eq!(result, ExecutionResult::Cancelled);
        assert_eq!(text.call_count(), 0);
        assert_eq!(usage.event_count().await, 0);
    }

    #[tokio::test]
    async fn test_cancel_during_provider_call() {
        let text = Arc::new(MockTextProvider::new("mock-text").with_latency(Duration::from_secs(30)));
        let usage = Arc::new(InMemoryUsageService::new());
        let executor = executor(text.clone(), usage.clone(), Arc::new(InMemoryArtifactStore::new()));

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result = executor.execute(&RewriteSelection::new(), &input(), &cancel).await;
        assert_eq!(result, ExecutionResult::Cancelled);
        assert_eq!(text.call_count(), 1);
        assert_eq!(usage.event_count().await, 0);
    }

    #[tokio::test]
    async fn test_artifact_store_failure() {
        let text = Arc::new(MockTextProvider::new("mock-text"));
        let usage = Arc::new(InMemoryUsageService::new());
        let executor = executor(text, usage.clone(), Arc::new(FullDisk));

        let result = executor
            .execute(&GenerateCoverImage::new(), &input(), &CancellationToken::new())
            .await;
        let rejection = match &result {
            ExecutionResult::Failed(r) => r,
            other => panic!("expected Failed, got {:?}", other),
        };
        assert_eq!(rejection.kind, ErrorKind::Storage);
        assert_eq!(rejection.code, "ai.artifact_store_failed");
        assert!(rejection.message.contains("disk full"));
        assert_eq!(usage.event_count().await, 0);
    }

    #[tokio::test]
    async fn test_provider_failure_is_failed_with_provider_id() {
        let text = Arc::new(MockTextProvider::new("mock-text").failing("HTTP 503"));
        let usage = Arc::new(InMemoryUsageService::new());
        let executor = executor(text, usage.clone(), Arc::new(InMemoryArtifactStore::new()));

        let result = executor
            .execute(&RewriteSelection::new(), &input(), &CancellationToken::new())
            .await;
        let rejection = match &result {
            ExecutionResult::Failed(r) => r,
            other => panic!("expected Failed, got {:?}", other),
        };
        assert_eq!(rejection.kind, ErrorKind::Provider);
        assert_eq!(rejection.provider_id.as_deref(), Some("mock-text"));
        assert_eq!(usage.event_count().await, 0);
    }
}
