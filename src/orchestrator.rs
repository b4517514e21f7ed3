// src/orchestrator.rs
// Facade over the catalog, executor and streaming manager

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::actions::{ActionCatalog, ActionDescriptor, ActionInput};
use crate::applier::ProposalApplier;
use crate::artifacts::{ArtifactStore, InMemoryArtifactStore};
use crate::config::AiConfig;
use crate::error::AiError;
use crate::executor::ActionExecutor;
use crate::pipeline::ExecutionPipeline;
use crate::providers::ProviderRegistry;
use crate::router::{ProviderRouter, RoutingPolicy};
use crate::streaming::{StreamingSession, StreamingSessionManager};
use crate::types::ExecutionResult;
use crate::usage::{InMemoryUsageService, UsageGate, UsageService};

/// Whether an action can stream right now, and through which provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamingCapability {
    pub supported: bool,
    pub provider_id: Option<String>,
    pub reason: String,
}

impl StreamingCapability {
    fn unsupported(reason: impl Into<String>) -> Self {
        Self {
            supported: false,
            provider_id: None,
            reason: reason.into(),
        }
    }
}

/// Entry point for running AI actions
pub struct AiOrchestrator {
    config: AiConfig,
    catalog: ActionCatalog,
    pipeline: Arc<ExecutionPipeline>,
    executor: ActionExecutor,
    streaming: StreamingSessionManager,
}

impl AiOrchestrator {
    pub fn builder(config: AiConfig) -> OrchestratorBuilder {
        OrchestratorBuilder::new(config)
    }

    pub fn config(&self) -> &AiConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        self.pipeline.router().registry()
    }

    pub fn artifacts(&self) -> Arc<dyn ArtifactStore> {
        self.pipeline.artifacts().clone()
    }

    /// Applier resolving artifacts from this orchestrator's store
    pub fn applier(&self) -> ProposalApplier {
        ProposalApplier::new(self.artifacts())
    }

    pub fn list_actions(&self) -> Vec<ActionDescriptor> {
        self.catalog.list()
    }

    pub fn get_action(&self, action_id: &str) -> Option<ActionDescriptor> {
        self.catalog.get(action_id).map(|a| a.descriptor())
    }

    /// Quick pre-check: AI enabled, action known and routable
    pub fn can_run(&self, action_id: &str) -> bool {
        let Some(action) = self.catalog.get(action_id) else {
            return false;
        };
        self.config.enabled
            && self
                .pipeline
                .router()
                .can_route(action.primary_modality(), false, action.default_provider_id())
    }

    pub fn streaming_capability(&self, action_id: &str) -> StreamingCapability {
        let Some(action) = self.catalog.get(action_id) else {
            return StreamingCapability::unsupported(format!("unknown action: {}", action_id));
        };
        if !self.config.enabled {
            return StreamingCapability::unsupported("AI features are disabled");
        }
        if !self.streaming.is_enabled() {
            return StreamingCapability::unsupported("streaming is disabled");
        }

        match self
            .pipeline
            .router()
            .route(action.primary_modality(), true, action.default_provider_id())
        {
            Ok(route) => StreamingCapability {
                supported: true,
                provider_id: Some(route.provider_id),
                reason: route.reason,
            },
            Err(e) => StreamingCapability::unsupported(e.to_string()),
        }
    }

    #[instrument(skip(self, input, cancel), fields(caller = %input.caller_id))]
    pub async fn execute(
        &self,
        action_id: &str,
        input: &ActionInput,
        cancel: &CancellationToken,
    ) -> ExecutionResult {
        match self.catalog.get(action_id) {
            Some(action) => self.executor.execute(action.as_ref(), input, cancel).await,
            None => {
                warn!("Unknown action requested");
                ExecutionResult::from_error(&AiError::ActionNotFound(action_id.to_string()))
            }
        }
    }

    pub fn execute_streaming(
        &self,
        action_id: &str,
        input: ActionInput,
        cancel: CancellationToken,
    ) -> StreamingSession {
        match self.catalog.get(action_id) {
            Some(action) => self.streaming.start(action, input, cancel),
            None => {
                warn!(action = action_id, "Unknown action requested for streaming");
                StreamingSessionManager::rejected(AiError::ActionNotFound(action_id.to_string()))
            }
        }
    }
}

/// Composes an [`AiOrchestrator`]. Unset collaborators get in-memory defaults.
pub struct OrchestratorBuilder {
    config: AiConfig,
    registry: ProviderRegistry,
    usage: Option<Arc<dyn UsageService>>,
    artifacts: Option<Arc<dyn ArtifactStore>>,
    catalog: Option<ActionCatalog>,
}

impl OrchestratorBuilder {
    pub fn new(config: AiConfig) -> Self {
        Self {
            config,
            registry: ProviderRegistry::new(),
            usage: None,
            artifacts: None,
            catalog: None,
        }
    }

    pub fn registry(mut self, registry: ProviderRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn usage_service(mut self, usage: Arc<dyn UsageService>) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn artifact_store(mut self, artifacts: Arc<dyn ArtifactStore>) -> Self {
        self.artifacts = Some(artifacts);
        self
    }

    pub fn catalog(mut self, catalog: ActionCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn build(self) -> AiOrchestrator {
        for id in [
            &self.config.default_text_provider_id,
            &self.config.default_image_provider_id,
        ]
        .into_iter()
        .flatten()
        {
            if self.registry.get(id).is_none() {
                warn!(provider = %id, "Configured default provider is not registered");
            }
        }

        let usage = self
            .usage
            .unwrap_or_else(|| Arc::new(InMemoryUsageService::new()) as Arc<dyn UsageService>);
        let artifacts = self
            .artifacts
            .unwrap_or_else(|| Arc::new(InMemoryArtifactStore::new()) as Arc<dyn ArtifactStore>);
        let catalog = self.catalog.unwrap_or_else(ActionCatalog::with_defaults);

        let router = ProviderRouter::new(Arc::new(self.registry), RoutingPolicy::from_config(&self.config));
        let gate = UsageGate::new(self.config.enabled, usage);
        let pipeline = Arc::new(ExecutionPipeline::new(router, gate, artifacts));

        debug!(
            actions = catalog.len(),
            providers = pipeline.router().registry().len(),
            "Orchestrator ready"
        );

        AiOrchestrator {
            executor: ActionExecutor::new(pipeline.clone()),
            streaming: StreamingSessionManager::new(pipeline.clone(), self.config.streaming_enabled),
            pipeline,
            catalog,
            config: self.config,
        }
    }
}
