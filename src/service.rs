/// Top-level indexing service
///
/// Owns an explicit registry of per-workspace orchestrators keyed by
/// normalized path, with a create/get/destroy lifecycle. Shared
/// configuration lives here; each worker command snapshots it, so a run
/// always sees one immutable config.
use crate::config::{EmbeddingConfigPatch, IndexConfig, IndexConfigPatch};
use crate::embedding::{ConnectionStatus, EmbeddingClient};
use crate::error::WorkerError;
use crate::orchestrator::{IndexOrchestrator, IndexStatus};
use crate::paths::normalize_path;
use crate::store::{SearchResult, VectorStore};
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

pub struct IndexService {
    config: Arc<RwLock<IndexConfig>>,
    embedder: Arc<dyn EmbeddingClient>,
    orchestrators: RwLock<HashMap<String, Arc<IndexOrchestrator>>>,
}

impl IndexService {
    pub fn new(embedder: Arc<dyn EmbeddingClient>, config: IndexConfig) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            embedder,
            orchestrators: RwLock::new(HashMap::new()),
        }
    }

    /// Register a workspace with its vector store, creating (or reusing)
    /// its orchestrator. The registry key is the canonical path.
    pub async fn register_workspace(
        &self,
        workspace_path: &str,
        store: Arc<dyn VectorStore>,
    ) -> Result<Arc<IndexOrchestrator>> {
        let normalized = normalize_path(workspace_path)?;

        let mut orchestrators = self.orchestrators.write().await;
        if let Some(existing) = orchestrators.get(&normalized) {
            return Ok(existing.clone());
        }

        tracing::info!("Registering workspace: {}", normalized);
        let orchestrator = IndexOrchestrator::new(
            normalized.clone(),
            store,
            self.embedder.clone(),
            self.config.clone(),
        )
        .await?;

        orchestrators.insert(normalized, orchestrator.clone());
        Ok(orchestrator)
    }

    /// Look up a registered workspace
    pub async fn get(&self, workspace_path: &str) -> Option<Arc<IndexOrchestrator>> {
        let normalized = normalize_path(workspace_path).ok()?;
        self.orchestrators.read().await.get(&normalized).cloned()
    }

    /// Tear down and remove a workspace. Returns whether it existed.
    pub async fn destroy_workspace(&self, workspace_path: &str) -> Result<bool> {
        let normalized = normalize_path(workspace_path)?;
        let removed = self.orchestrators.write().await.remove(&normalized);

        match removed {
            Some(orchestrator) => {
                tracing::info!("Destroying workspace: {}", normalized);
                orchestrator.shutdown();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn orchestrator(&self, workspace_path: &str) -> Result<Arc<IndexOrchestrator>> {
        self.get(workspace_path)
            .await
            .ok_or_else(|| WorkerError::WorkspaceNotRegistered(workspace_path.to_string()).into())
    }

    /// Start a full index run for a workspace (no-op while one is active)
    pub async fn index_workspace(&self, workspace_path: &str) -> Result<()> {
        self.orchestrator(workspace_path).await?.index_workspace().await
    }

    /// Re-index one file of a workspace
    pub async fn update_file(&self, workspace_path: &str, file: &str) -> Result<()> {
        self.orchestrator(workspace_path).await?.update_file(file).await
    }

    /// Re-index several files of a workspace
    pub async fn update_files(&self, workspace_path: &str, files: Vec<String>) -> Result<()> {
        self.orchestrator(workspace_path).await?.update_files(files).await
    }

    /// Remove one file's entries from a workspace index
    pub async fn delete_file_index(&self, workspace_path: &str, file: &str) -> Result<()> {
        self.orchestrator(workspace_path)
            .await?
            .delete_file_index(file)
            .await
    }

    /// Drop all indexed data for a workspace
    pub async fn clear_index(&self, workspace_path: &str) -> Result<()> {
        self.orchestrator(workspace_path).await?.clear_index().await
    }

    /// Semantic search over a workspace index
    pub async fn search(
        &self,
        workspace_path: &str,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        self.orchestrator(workspace_path)
            .await?
            .search(query, top_k)
            .await
    }

    /// Hybrid (vector + keyword) search over a workspace index
    pub async fn hybrid_search(
        &self,
        workspace_path: &str,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        self.orchestrator(workspace_path)
            .await?
            .hybrid_search(query, top_k)
            .await
    }

    /// Status snapshot for a workspace
    pub async fn get_status(&self, workspace_path: &str) -> Result<IndexStatus> {
        Ok(self.orchestrator(workspace_path).await?.get_status())
    }

    /// Whether a workspace has any indexed data
    pub async fn has_index(&self, workspace_path: &str) -> Result<bool> {
        self.orchestrator(workspace_path).await?.has_index().await
    }

    /// Aggregate store statistics for a workspace
    pub async fn index_stats(&self, workspace_path: &str) -> Result<crate::store::StoreStats> {
        self.orchestrator(workspace_path).await?.index_stats().await
    }

    /// Current shared configuration
    pub async fn get_config(&self) -> IndexConfig {
        self.config.read().await.clone()
    }

    /// Apply a partial configuration update. Takes effect for subsequent
    /// runs; an in-flight run keeps its snapshot.
    pub async fn update_config(&self, patch: IndexConfigPatch) -> Result<()> {
        let mut config = self.config.write().await;
        let next = config.patched(patch);
        next.validate()?;
        *config = next;
        Ok(())
    }

    /// Apply a partial embedding configuration update
    pub async fn update_embedding_config(&self, patch: EmbeddingConfigPatch) -> Result<()> {
        let mut config = self.config.write().await;
        let mut next = config.clone();
        next.embedding = next.embedding.patched(patch);
        next.validate()?;
        *config = next;
        Ok(())
    }

    /// Check the embedding provider's reachability
    pub async fn test_embedding_connection(&self) -> ConnectionStatus {
        self.embedder.test_connection().await
    }
}
