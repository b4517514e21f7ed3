// src/artifacts.rs
// Artifact store: where generated images live until a proposal is applied

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::types::Artifact;

/// External artifact storage
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Persist an artifact; returns the id it can be fetched by
    async fn store(&self, artifact: Artifact) -> Result<String>;

    async fn get(&self, id: &str) -> Result<Option<Artifact>>;
}

/// Artifact store backed by a map in memory
#[derive(Default)]
pub struct InMemoryArtifactStore {
    artifacts: RwLock<HashMap<String, Artifact>>,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.artifacts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.artifacts.read().await.is_empty()
    }
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn store(&self, artifact: Artifact) -> Result<String> {
        let id = artifact.id.clone();
        debug!(
            artifact_id = %id,
            mime_type = %artifact.mime_type,
            size = artifact.size(),
            hash = %artifact.content_hash,
            "Stored artifact"
        );
        self.artifacts.write().await.insert(id.clone(), artifact);
        Ok(id)
    }

    async fn get(&self, id: &str) -> Result<Option<Artifact>> {
        Ok(self.artifacts.read().await.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_and_get() {
        let store = InMemoryArtifactStore::new();
        let artifact = Artifact::image("image/png", vec![1, 2, 3]);
        let id = store.store(artifact.clone()).await.unwrap();

        assert_eq!(id, artifact.id);
        assert_eq!(store.get(&id).await.unwrap(), Some(artifact));
        assert_eq!(store.len().await, 1);
        assert!(store.get("missing").await.unwrap().is_none());
    }
}
