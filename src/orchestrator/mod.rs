/// Index orchestrator
///
/// One instance per normalized workspace path. Owns the worker handle and
/// the index status, forwards worker output to the vector store, and
/// broadcasts throttled status updates. All status mutation during a run
/// happens inside the single response-handling task, so no locking beyond
/// the snapshot mutex is needed.
mod fusion;

use crate::chunk::IndexedChunk;
use crate::config::IndexConfig;
use crate::embedding::EmbeddingClient;
use crate::store::{SearchResult, VectorStore};
use crate::worker::{IndexWorker, WorkerCommand, WorkerHandle, WorkerResponse};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;

/// Minimum interval between progress emissions; terminal states bypass it
const PROGRESS_MIN_INTERVAL: Duration = Duration::from_millis(100);

/// Observable state of one workspace index
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexStatus {
    pub is_indexing: bool,
    pub total_files: usize,
    pub indexed_files: usize,
    pub total_chunks: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_indexed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct IndexOrchestrator {
    workspace_path: String,
    config: Arc<RwLock<IndexConfig>>,
    status: Arc<Mutex<IndexStatus>>,
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingClient>,
    worker: WorkerHandle,
    events: broadcast::Sender<IndexStatus>,
    handler: JoinHandle<()>,
}

impl IndexOrchestrator {
    /// Create the orchestrator, initialize the store and spawn the worker
    /// plus its response handler.
    pub async fn new(
        workspace_path: String,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingClient>,
        config: Arc<RwLock<IndexConfig>>,
    ) -> Result<Arc<Self>> {
        store
            .initialize()
            .await
            .context("Failed to initialize vector store")?;

        let (worker, responses) = IndexWorker::spawn(embedder.clone());
        let status = Arc::new(Mutex::new(IndexStatus::default()));
        let (events, _) = broadcast::channel(64);

        let handler = tokio::spawn(handle_responses(
            responses,
            status.clone(),
            store.clone(),
            events.clone(),
        ));

        Ok(Arc::new(Self {
            workspace_path,
            config,
            status,
            store,
            embedder,
            worker,
            events,
            handler,
        }))
    }

    /// Start a full index run. A call while a run is active is a no-op,
    /// not queued.
    pub async fn index_workspace(&self) -> Result<()> {
        {
            let mut status = self.status.lock().unwrap();
            if status.is_indexing {
                tracing::debug!(
                    "Indexing already in progress for {}, ignoring",
                    self.workspace_path
                );
                return Ok(());
            }
            *status = IndexStatus {
                is_indexing: true,
                ..Default::default()
            };
        }

        if let Err(e) = self.dispatch_index().await {
            let mut status = self.status.lock().unwrap();
            status.is_indexing = false;
            status.error = Some(format!("{:#}", e));
            drop(status);
            self.emit_now();
            return Err(e);
        }

        Ok(())
    }

    async fn dispatch_index(&self) -> Result<()> {
        let existing = self
            .store
            .get_file_hashes()
            .await
            .context("Failed to read stored file hashes")?;

        let config = self.config.read().await.clone();

        self.worker
            .send(WorkerCommand::Index {
                workspace_path: self.workspace_path.clone(),
                config,
                existing_hashes: if existing.is_empty() {
                    None
                } else {
                    Some(existing)
                },
            })
            .await?;

        Ok(())
    }

    /// Re-index a single file (workspace-relative path)
    pub async fn update_file(&self, file: &str) -> Result<()> {
        let config = self.config.read().await.clone();
        self.worker
            .send(WorkerCommand::Update {
                workspace_path: self.workspace_path.clone(),
                file: file.to_string(),
                config,
            })
            .await?;
        Ok(())
    }

    /// Re-index a list of files at reduced concurrency
    pub async fn update_files(&self, files: Vec<String>) -> Result<()> {
        let config = self.config.read().await.clone();
        self.worker
            .send(WorkerCommand::BatchUpdate {
                workspace_path: self.workspace_path.clone(),
                files,
                config,
            })
            .await?;
        Ok(())
    }

    /// Drop one file's chunks from the store
    pub async fn delete_file_index(&self, file: &str) -> Result<()> {
        self.store.delete_file(file).await
    }

    /// Drop all indexed data for this workspace and reset status
    pub async fn clear_index(&self) -> Result<()> {
        self.store.clear().await?;
        {
            let mut status = self.status.lock().unwrap();
            *status = IndexStatus::default();
        }
        self.emit_now();
        Ok(())
    }

    /// Semantic search: the query is embedded on the orchestration side
    /// for lower latency, then delegated to the store.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        let vector = self
            .embedder
            .embed(query)
            .await
            .context("Failed to embed query")?;
        self.store.search(vector, top_k).await
    }

    /// Hybrid search: vector candidates re-ranked together with a keyword
    /// ranking of the same candidates via reciprocal rank fusion.
    pub async fn hybrid_search(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        let vector = self
            .embedder
            .embed(query)
            .await
            .context("Failed to embed query")?;

        let candidates = self.store.search(vector, top_k.saturating_mul(2)).await?;
        if candidates.is_empty() {
            return Ok(candidates);
        }

        let vector_ranked: Vec<(usize, f32)> = candidates
            .iter()
            .enumerate()
            .map(|(idx, c)| (idx, c.score))
            .collect();
        let keyword_ranked = fusion::keyword_rank(query, &candidates);

        let fused = fusion::reciprocal_rank_fusion([vector_ranked, keyword_ranked], top_k);

        Ok(fused
            .into_iter()
            .map(|(idx, score)| {
                let mut result = candidates[idx].clone();
                result.score = score;
                result
            })
            .collect())
    }

    /// Whether the store holds any data for this workspace
    pub async fn has_index(&self) -> Result<bool> {
        self.store.has_index().await
    }

    /// Aggregate store statistics for this workspace
    pub async fn index_stats(&self) -> Result<crate::store::StoreStats> {
        self.store.get_stats().await
    }

    /// Snapshot of the current status
    pub fn get_status(&self) -> IndexStatus {
        self.status.lock().unwrap().clone()
    }

    /// Subscribe to throttled status updates
    pub fn subscribe(&self) -> broadcast::Receiver<IndexStatus> {
        self.events.subscribe()
    }

    pub fn workspace_path(&self) -> &str {
        &self.workspace_path
    }

    /// Tear down the worker and the response handler
    pub fn shutdown(&self) {
        self.worker.shutdown();
        self.handler.abort();
    }

    fn emit_now(&self) {
        let snapshot = self.status.lock().unwrap().clone();
        let _ = self.events.send(snapshot);
    }
}

/// Single consumer of the worker's response stream; the only place run
/// state is mutated.
async fn handle_responses(
    mut responses: mpsc::Receiver<WorkerResponse>,
    status: Arc<Mutex<IndexStatus>>,
    store: Arc<dyn VectorStore>,
    events: broadcast::Sender<IndexStatus>,
) {
    let mut last_emit: Option<Instant> = None;

    let emit = |status: &Arc<Mutex<IndexStatus>>,
                last_emit: &mut Option<Instant>,
                forced: bool| {
        let throttled = last_emit
            .map(|at| at.elapsed() < PROGRESS_MIN_INTERVAL)
            .unwrap_or(false);
        if forced || !throttled {
            let snapshot = status.lock().unwrap().clone();
            let _ = events.send(snapshot);
            *last_emit = Some(Instant::now());
        }
    };

    while let Some(response) = responses.recv().await {
        match response {
            WorkerResponse::Progress { processed, total } => {
                {
                    let mut st = status.lock().unwrap();
                    st.indexed_files = processed;
                    st.total_files = total;
                }
                emit(&status, &mut last_emit, false);
            }
            WorkerResponse::Result {
                chunks,
                processed,
                total,
            } => {
                let count = chunks.len();
                if let Err(e) = store.add_batch(chunks).await {
                    tracing::warn!("Failed to store chunk batch: {:#}", e);
                }
                {
                    let mut st = status.lock().unwrap();
                    st.total_chunks += count;
                    st.indexed_files = processed;
                    st.total_files = total;
                }
                emit(&status, &mut last_emit, false);
            }
            WorkerResponse::UpdateResult {
                file_path,
                chunks,
                deleted,
            } => {
                apply_file_update(&store, &file_path, chunks, deleted).await;
                emit(&status, &mut last_emit, false);
            }
            WorkerResponse::BatchUpdateResult { results } => {
                for entry in results {
                    apply_file_update(&store, &entry.file_path, entry.chunks, entry.deleted)
                        .await;
                }
                emit(&status, &mut last_emit, false);
            }
            WorkerResponse::Complete { total_chunks } => {
                {
                    let mut st = status.lock().unwrap();
                    st.total_chunks = total_chunks;
                    st.is_indexing = false;
                    st.last_indexed_at = Some(Utc::now());
                }
                emit(&status, &mut last_emit, true);
            }
            WorkerResponse::Error { error } => {
                tracing::error!("Worker reported failure: {}", error);
                {
                    let mut st = status.lock().unwrap();
                    st.error = Some(error);
                    st.is_indexing = false;
                }
                emit(&status, &mut last_emit, true);
            }
        }
    }
}

/// Apply one file's update outcome to the store. An entry with no chunks
/// and no deletion flag is a tolerated per-file failure: the store keeps
/// whatever it had rather than committing a partial result.
async fn apply_file_update(
    store: &Arc<dyn VectorStore>,
    file_path: &str,
    chunks: Vec<IndexedChunk>,
    deleted: bool,
) {
    if deleted {
        if let Err(e) = store.delete_file(file_path).await {
            tracing::warn!("Failed to delete index entries for {}: {:#}", file_path, e);
        }
    } else if !chunks.is_empty() {
        if let Err(e) = store.upsert_file(file_path, chunks).await {
            tracing::warn!("Failed to upsert index entries for {}: {:#}", file_path, e);
        }
    }
}
