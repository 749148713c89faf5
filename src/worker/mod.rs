/// Worker executor
///
/// Runs the scan/chunk/embed pipeline on a dedicated tokio task so that
/// parsing and embedding never block the caller. The only way in or out
/// is the typed message protocol; chunk and vector data is moved across
/// the boundary, never shared.
pub mod protocol;
pub mod scan;

pub use protocol::{FileUpdate, WorkerCommand, WorkerResponse};
pub use scan::{scan_workspace, ScannedFile};

use crate::chunk::{Chunker, CodeChunk, IndexedChunk, SemanticChunker};
use crate::config::IndexConfig;
use crate::embedding::EmbeddingClient;
use crate::error::WorkerError;
use crate::hash;
use anyhow::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

/// Concurrency cap for a full index run
const INDEX_CONCURRENCY: usize = 10;
/// Lower cap for batch updates, which run interleaved with live editing
const BATCH_UPDATE_CONCURRENCY: usize = 5;
/// Buffered chunks are flushed as a `result` once this many accumulate
const RESULT_BATCH_SIZE: usize = 50;
/// A progress ping is sent every N processed files even with no chunks
const PROGRESS_FILE_INTERVAL: usize = 10;

/// Handle to a spawned worker. Dropping the handle (or calling
/// [`WorkerHandle::shutdown`]) tears the worker down; there is no finer
/// cancellation primitive.
pub struct WorkerHandle {
    commands: mpsc::Sender<WorkerCommand>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl WorkerHandle {
    /// Enqueue a command for the worker
    pub async fn send(&self, command: WorkerCommand) -> Result<(), WorkerError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| WorkerError::CommandChannelClosed)
    }

    /// Tear the worker down, abandoning any in-flight run
    pub fn shutdown(&self) {
        self.cancel.cancel();
        self.task.abort();
    }
}

/// Outcome of processing one file during an index run
#[derive(Default)]
struct FileOutcome {
    chunks: Vec<IndexedChunk>,
    dropped: usize,
}

/// Outcome of re-processing one file during an update
struct UpdateOutcome {
    chunks: Vec<IndexedChunk>,
    deleted: bool,
    dropped: usize,
}

pub struct IndexWorker {
    embedder: Arc<dyn EmbeddingClient>,
    /// Shared across commands so grammar-failure caching holds for the
    /// worker's lifetime
    semantic: Arc<SemanticChunker>,
}

impl IndexWorker {
    /// Spawn the worker task. Returns the command handle and the response
    /// stream; the caller owns both ends.
    pub fn spawn(
        embedder: Arc<dyn EmbeddingClient>,
    ) -> (WorkerHandle, mpsc::Receiver<WorkerResponse>) {
        let (command_tx, mut command_rx) = mpsc::channel::<WorkerCommand>(16);
        let (response_tx, response_rx) = mpsc::channel::<WorkerResponse>(256);
        let cancel = CancellationToken::new();
        let cancelled = cancel.clone();

        let task = tokio::spawn(async move {
            let worker = IndexWorker {
                embedder,
                semantic: Arc::new(SemanticChunker::new()),
            };

            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    command = command_rx.recv() => match command {
                        Some(command) => worker.handle_command(command, &response_tx).await,
                        None => break,
                    },
                }
            }

            tracing::debug!("Index worker shutting down");
        });

        (
            WorkerHandle {
                commands: command_tx,
                cancel,
                task,
            },
            response_rx,
        )
    }

    async fn handle_command(
        &self,
        command: WorkerCommand,
        responses: &mpsc::Sender<WorkerResponse>,
    ) {
        let result = match command {
            WorkerCommand::Index {
                workspace_path,
                config,
                existing_hashes,
            } => {
                self.run_index(workspace_path, config, existing_hashes, responses)
                    .await
            }
            WorkerCommand::Update {
                workspace_path,
                file,
                config,
            } => self.run_update(workspace_path, file, config, responses).await,
            WorkerCommand::BatchUpdate {
                workspace_path,
                files,
                config,
            } => {
                self.run_batch_update(workspace_path, files, config, responses)
                    .await
            }
        };

        // Per-file failures are swallowed inside the runs; anything that
        // reaches here is fatal for the command, not for the worker.
        if let Err(e) = result {
            tracing::error!("Worker command failed: {:#}", e);
            let _ = responses
                .send(WorkerResponse::Error {
                    error: format!("{:#}", e),
                })
                .await;
        }
    }

    /// Full workspace scan with incremental skip
    async fn run_index(
        &self,
        workspace_path: String,
        config: IndexConfig,
        existing_hashes: Option<Vec<(String, String)>>,
        responses: &mpsc::Sender<WorkerResponse>,
    ) -> Result<()> {
        let root = PathBuf::from(&workspace_path);
        let config = Arc::new(config);
        let files = scan_workspace(&root, &config)?;
        let total = files.len();

        let existing: HashMap<String, String> =
            existing_hashes.unwrap_or_default().into_iter().collect();

        // Stale paths are reported deleted before any file is processed,
        // exactly once per run.
        for stale in hash::deleted_paths(&existing, files.iter().map(|f| f.relative_path.as_str()))
        {
            send(
                responses,
                WorkerResponse::UpdateResult {
                    file_path: stale,
                    chunks: Vec::new(),
                    deleted: true,
                },
            )
            .await?;
        }

        let chunker = Arc::new(Chunker::with_semantic(
            self.semantic.clone(),
            config.chunk_size,
        ));
        let semaphore = Arc::new(Semaphore::new(INDEX_CONCURRENCY));
        let mut tasks = JoinSet::new();

        for file in files {
            let permit = semaphore.clone().acquire_owned().await?;
            let prior = existing.get(&file.relative_path).cloned();
            let root = root.clone();
            let config = config.clone();
            let chunker = chunker.clone();
            let embedder = self.embedder.clone();

            tasks.spawn(async move {
                let outcome =
                    process_file(&file, prior.as_deref(), &root, &config, &chunker, &embedder)
                        .await;
                drop(permit);
                outcome
            });
        }

        let mut processed = 0usize;
        let mut total_chunks = 0usize;
        let mut dropped_chunks = 0usize;
        let mut buffer: Vec<IndexedChunk> = Vec::new();

        while let Some(joined) = tasks.join_next().await {
            processed += 1;

            match joined {
                Ok(outcome) => {
                    total_chunks += outcome.chunks.len();
                    dropped_chunks += outcome.dropped;
                    buffer.extend(outcome.chunks);
                }
                Err(e) => {
                    // A panicked file task still counts as processed
                    tracing::warn!("File task failed: {}", e);
                }
            }

            if buffer.len() >= RESULT_BATCH_SIZE {
                send(
                    responses,
                    WorkerResponse::Result {
                        chunks: std::mem::take(&mut buffer),
                        processed,
                        total,
                    },
                )
                .await?;
            } else if processed % PROGRESS_FILE_INTERVAL == 0 {
                send(responses, WorkerResponse::Progress { processed, total }).await?;
            }
        }

        if !buffer.is_empty() {
            send(
                responses,
                WorkerResponse::Result {
                    chunks: buffer,
                    processed,
                    total,
                },
            )
            .await?;
        }

        if dropped_chunks > 0 {
            tracing::warn!(
                "{} chunks dropped during indexing (no embedding vector)",
                dropped_chunks
            );
        }

        send(responses, WorkerResponse::Complete { total_chunks }).await
    }

    /// Re-process one file
    async fn run_update(
        &self,
        workspace_path: String,
        file: String,
        config: IndexConfig,
        responses: &mpsc::Sender<WorkerResponse>,
    ) -> Result<()> {
        let root = PathBuf::from(&workspace_path);
        let chunker = Chunker::with_semantic(self.semantic.clone(), config.chunk_size);

        let outcome =
            process_update(&root.join(&file), &root, &config, &chunker, &self.embedder).await;

        if outcome.dropped > 0 {
            tracing::warn!(
                "{} chunks dropped while updating {} (no embedding vector)",
                outcome.dropped,
                file
            );
        }

        send(
            responses,
            WorkerResponse::UpdateResult {
                file_path: file,
                chunks: outcome.chunks,
                deleted: outcome.deleted,
            },
        )
        .await
    }

    /// Re-process a list of files and answer with a single aggregate
    async fn run_batch_update(
        &self,
        workspace_path: String,
        files: Vec<String>,
        config: IndexConfig,
        responses: &mpsc::Sender<WorkerResponse>,
    ) -> Result<()> {
        let root = PathBuf::from(&workspace_path);
        let config = Arc::new(config);
        let chunker = Arc::new(Chunker::with_semantic(
            self.semantic.clone(),
            config.chunk_size,
        ));
        let semaphore = Arc::new(Semaphore::new(BATCH_UPDATE_CONCURRENCY));
        let mut tasks = JoinSet::new();

        for (position, file) in files.iter().enumerate() {
            let permit = semaphore.clone().acquire_owned().await?;
            let file = file.clone();
            let root = root.clone();
            let config = config.clone();
            let chunker = chunker.clone();
            let embedder = self.embedder.clone();

            tasks.spawn(async move {
                let outcome =
                    process_update(&root.join(&file), &root, &config, &chunker, &embedder).await;
                drop(permit);
                (position, file, outcome)
            });
        }

        // Exactly one entry per requested file, in request order
        let mut slots: Vec<Option<FileUpdate>> = (0..files.len()).map(|_| None).collect();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((position, file, outcome)) => {
                    slots[position] = Some(FileUpdate {
                        file_path: file,
                        chunks: outcome.chunks,
                        deleted: outcome.deleted,
                    });
                }
                Err(e) => {
                    tracing::warn!("Batch update task failed: {}", e);
                }
            }
        }

        let results = slots
            .into_iter()
            .zip(files)
            .map(|(slot, file)| {
                slot.unwrap_or_else(|| FileUpdate {
                    file_path: file,
                    chunks: Vec::new(),
                    deleted: false,
                })
            })
            .collect();

        send(responses, WorkerResponse::BatchUpdateResult { results }).await
    }
}

async fn send(responses: &mpsc::Sender<WorkerResponse>, response: WorkerResponse) -> Result<()> {
    responses
        .send(response)
        .await
        .map_err(|_| anyhow::anyhow!("response channel closed"))
}

/// Index-run pipeline for one file. Skips (oversize, unreadable, binary,
/// unchanged hash, zero chunks) and per-file failures all produce an empty
/// outcome; the file is still counted as processed by the caller.
async fn process_file(
    file: &ScannedFile,
    prior_hash: Option<&str>,
    root: &Path,
    config: &IndexConfig,
    chunker: &Chunker,
    embedder: &Arc<dyn EmbeddingClient>,
) -> FileOutcome {
    let content = match tokio::fs::read_to_string(&file.path).await {
        Ok(content) => content,
        Err(e) => {
            tracing::debug!("Skipping unreadable file {:?}: {}", file.path, e);
            return FileOutcome::default();
        }
    };

    if content.len() > config.max_file_size {
        tracing::debug!("Skipping oversized file {:?}", file.path);
        return FileOutcome::default();
    }

    if !scan::is_probably_text(&content) {
        tracing::debug!("Skipping binary file {:?}", file.path);
        return FileOutcome::default();
    }

    let file_hash = hash::content_hash(&content);
    if prior_hash == Some(file_hash.as_str()) {
        return FileOutcome::default();
    }

    let chunks = chunker.chunk_file(&file.path, &content, root, &file_hash);
    if chunks.is_empty() {
        return FileOutcome::default();
    }

    match embed_chunks(embedder, chunks).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::warn!("Failed to embed {:?}: {:#}", file.path, e);
            FileOutcome::default()
        }
    }
}

/// Update pipeline for one file. A vanished file or zero-chunk result is
/// reported deleted so the caller can drop stale entries; an embedding
/// failure keeps the entry with its chunks omitted.
async fn process_update(
    path: &Path,
    root: &Path,
    config: &IndexConfig,
    chunker: &Chunker,
    embedder: &Arc<dyn EmbeddingClient>,
) -> UpdateOutcome {
    let deleted = UpdateOutcome {
        chunks: Vec::new(),
        deleted: true,
        dropped: 0,
    };

    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) => {
            tracing::debug!("File vanished or unreadable {:?}: {}", path, e);
            return deleted;
        }
    };

    if content.len() > config.max_file_size || !scan::is_probably_text(&content) {
        return deleted;
    }

    let file_hash = hash::content_hash(&content);
    let chunks = chunker.chunk_file(path, &content, root, &file_hash);
    if chunks.is_empty() {
        return deleted;
    }

    match embed_chunks(embedder, chunks).await {
        Ok(outcome) => UpdateOutcome {
            chunks: outcome.chunks,
            deleted: false,
            dropped: outcome.dropped,
        },
        Err(e) => {
            tracing::warn!("Failed to embed {:?}: {:#}", path, e);
            UpdateOutcome {
                chunks: Vec::new(),
                deleted: false,
                dropped: 0,
            }
        }
    }
}

/// Embed all of one file's chunks in a single batched provider call,
/// pairing each vector with its chunk. A missing vector drops the chunk
/// silently; the drop count is reported for logging only.
async fn embed_chunks(
    embedder: &Arc<dyn EmbeddingClient>,
    chunks: Vec<CodeChunk>,
) -> Result<FileOutcome> {
    let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
    let vectors = embedder.embed_batch(&texts).await?;

    anyhow::ensure!(
        vectors.len() == chunks.len(),
        "provider returned {} vectors for {} chunks",
        vectors.len(),
        chunks.len()
    );

    let mut indexed = Vec::with_capacity(chunks.len());
    let mut dropped = 0usize;

    for (chunk, vector) in chunks.into_iter().zip(vectors) {
        match vector {
            Some(vector) => indexed.push(IndexedChunk { chunk, vector }),
            None => dropped += 1,
        }
    }

    Ok(FileOutcome {
        chunks: indexed,
        dropped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::ConnectionStatus;
    use std::fs;
    use tempfile::TempDir;

    /// Deterministic embedder: one fixed-dimension vector per text, with
    /// optional per-text failures
    struct StubEmbedder {
        fail_containing: Option<String>,
    }

    #[async_trait::async_trait]
    impl EmbeddingClient for StubEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(vec![text.len() as f32, 1.0])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Option<Vec<f32>>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    if let Some(marker) = &self.fail_containing
                        && t.contains(marker.as_str())
                    {
                        None
                    } else {
                        Some(vec![t.len() as f32, 1.0])
                    }
                })
                .collect())
        }

        async fn test_connection(&self) -> ConnectionStatus {
            ConnectionStatus {
                success: true,
                error: None,
                latency_ms: Some(1),
            }
        }
    }

    fn stub() -> Arc<dyn EmbeddingClient> {
        Arc::new(StubEmbedder {
            fail_containing: None,
        })
    }

    fn write(dir: &TempDir, rel: &str, content: &str) {
        let path = dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    async fn drain(mut rx: mpsc::Receiver<WorkerResponse>) -> Vec<WorkerResponse> {
        let mut responses = Vec::new();
        while let Some(resp) = rx.recv().await {
            let terminal = matches!(
                resp,
                WorkerResponse::Complete { .. }
                    | WorkerResponse::Error { .. }
                    | WorkerResponse::UpdateResult { .. }
                    | WorkerResponse::BatchUpdateResult { .. }
            );
            responses.push(resp);
            if terminal {
                break;
            }
        }
        responses
    }

    const THREE_LINE_FN: &str = "fn body() {\n    let v = 1;\n    let w = 2;\n}\n";

    #[tokio::test]
    async fn test_index_emits_results_and_complete() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.rs", THREE_LINE_FN);
        write(&dir, "notes.md", "# Notes\n\nbody\n");

        let (handle, rx) = IndexWorker::spawn(stub());
        handle
            .send(WorkerCommand::Index {
                workspace_path: dir.path().to_string_lossy().to_string(),
                config: IndexConfig::default(),
                existing_hashes: None,
            })
            .await
            .unwrap();

        let responses = drain(rx).await;
        handle.shutdown();

        let total_chunks: usize = responses
            .iter()
            .filter_map(|r| match r {
                WorkerResponse::Result { chunks, .. } => Some(chunks.len()),
                _ => None,
            })
            .sum();
        assert_eq!(total_chunks, 2);

        match responses.last().unwrap() {
            WorkerResponse::Complete { total_chunks } => assert_eq!(*total_chunks, 2),
            other => panic!("expected complete, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_index_skips_unchanged_hashes() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.rs", THREE_LINE_FN);

        let prior = vec![(
            "a.rs".to_string(),
            crate::hash::content_hash(THREE_LINE_FN),
        )];

        let (handle, rx) = IndexWorker::spawn(stub());
        handle
            .send(WorkerCommand::Index {
                workspace_path: dir.path().to_string_lossy().to_string(),
                config: IndexConfig::default(),
                existing_hashes: Some(prior),
            })
            .await
            .unwrap();

        let responses = drain(rx).await;
        handle.shutdown();

        assert!(responses
            .iter()
            .all(|r| !matches!(r, WorkerResponse::Result { .. })));
        match responses.last().unwrap() {
            WorkerResponse::Complete { total_chunks } => assert_eq!(*total_chunks, 0),
            other => panic!("expected complete, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_index_reports_deletions_before_results() {
        let dir = TempDir::new().unwrap();
        write(&dir, "kept.rs", THREE_LINE_FN);

        let prior = vec![("removed.rs".to_string(), "stale-hash".to_string())];

        let (handle, rx) = IndexWorker::spawn(stub());
        handle
            .send(WorkerCommand::Index {
                workspace_path: dir.path().to_string_lossy().to_string(),
                config: IndexConfig::default(),
                existing_hashes: Some(prior),
            })
            .await
            .unwrap();

        let mut rx = rx;
        let mut responses = Vec::new();
        while let Some(resp) = rx.recv().await {
            let done = matches!(resp, WorkerResponse::Complete { .. });
            responses.push(resp);
            if done {
                break;
            }
        }
        handle.shutdown();

        match &responses[0] {
            WorkerResponse::UpdateResult {
                file_path, deleted, ..
            } => {
                assert_eq!(file_path, "removed.rs");
                assert!(deleted);
            }
            other => panic!("expected leading deletion, got {:?}", other),
        }

        let deletions = responses
            .iter()
            .filter(|r| matches!(r, WorkerResponse::UpdateResult { deleted: true, .. }))
            .count();
        assert_eq!(deletions, 1);
    }

    #[tokio::test]
    async fn test_update_vanished_file_reports_deleted() {
        let dir = TempDir::new().unwrap();

        let (handle, rx) = IndexWorker::spawn(stub());
        handle
            .send(WorkerCommand::Update {
                workspace_path: dir.path().to_string_lossy().to_string(),
                file: "missing.rs".to_string(),
                config: IndexConfig::default(),
            })
            .await
            .unwrap();

        let responses = drain(rx).await;
        handle.shutdown();

        match responses.last().unwrap() {
            WorkerResponse::UpdateResult {
                file_path,
                chunks,
                deleted,
            } => {
                assert_eq!(file_path, "missing.rs");
                assert!(chunks.is_empty());
                assert!(deleted);
            }
            other => panic!("expected update_result, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_batch_update_has_entry_per_file() {
        let dir = TempDir::new().unwrap();
        for name in ["a.rs", "b.rs", "c.rs", "d.rs"] {
            write(&dir, name, THREE_LINE_FN);
        }

        let files: Vec<String> = ["a.rs", "b.rs", "gone.rs", "c.rs", "d.rs"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let (handle, rx) = IndexWorker::spawn(stub());
        handle
            .send(WorkerCommand::BatchUpdate {
                workspace_path: dir.path().to_string_lossy().to_string(),
                files: files.clone(),
                config: IndexConfig::default(),
            })
            .await
            .unwrap();

        let responses = drain(rx).await;
        handle.shutdown();

        match responses.last().unwrap() {
            WorkerResponse::BatchUpdateResult { results } => {
                assert_eq!(results.len(), 5);
                for (result, requested) in results.iter().zip(&files) {
                    assert_eq!(&result.file_path, requested);
                }
                let deleted: Vec<&FileUpdate> =
                    results.iter().filter(|r| r.deleted).collect();
                assert_eq!(deleted.len(), 1);
                assert_eq!(deleted[0].file_path, "gone.rs");
                assert!(deleted[0].chunks.is_empty());
                assert!(results
                    .iter()
                    .filter(|r| !r.deleted)
                    .all(|r| !r.chunks.is_empty()));
            }
            other => panic!("expected batch_update_result, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_null_vector_drops_chunk_silently() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "mixed.rs",
            "fn keep_me() {\n    let a = 1;\n    let b = 2;\n}\n\nfn drop_me() {\n    let poison = 1;\n    let q = 2;\n}\n",
        );

        let embedder: Arc<dyn EmbeddingClient> = Arc::new(StubEmbedder {
            fail_containing: Some("poison".to_string()),
        });

        let (handle, rx) = IndexWorker::spawn(embedder);
        handle
            .send(WorkerCommand::Index {
                workspace_path: dir.path().to_string_lossy().to_string(),
                config: IndexConfig::default(),
                existing_hashes: None,
            })
            .await
            .unwrap();

        let responses = drain(rx).await;
        handle.shutdown();

        let chunks: Vec<&IndexedChunk> = responses
            .iter()
            .filter_map(|r| match r {
                WorkerResponse::Result { chunks, .. } => Some(chunks.iter()),
                _ => None,
            })
            .flatten()
            .collect();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk.symbols, vec!["keep_me".to_string()]);
    }

    #[tokio::test]
    async fn test_oversized_file_never_reaches_embedding() {
        let dir = TempDir::new().unwrap();
        let big_fn = format!(
            "fn big() {{\n{}\n}}\n",
            (0..50)
                .map(|i| format!("    let x{} = {};", i, i))
                .collect::<Vec<_>>()
                .join("\n")
        );
        write(&dir, "big.rs", &big_fn);

        let mut config = IndexConfig::default();
        config.max_file_size = 64;

        let (handle, rx) = IndexWorker::spawn(stub());
        handle
            .send(WorkerCommand::Index {
                workspace_path: dir.path().to_string_lossy().to_string(),
                config,
                existing_hashes: None,
            })
            .await
            .unwrap();

        let responses = drain(rx).await;
        handle.shutdown();

        match responses.last().unwrap() {
            WorkerResponse::Complete { total_chunks } => assert_eq!(*total_chunks, 0),
            other => panic!("expected complete, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_workspace_surfaces_error_response() {
        let (handle, rx) = IndexWorker::spawn(stub());
        handle
            .send(WorkerCommand::Index {
                workspace_path: "/nonexistent/workspace".to_string(),
                config: IndexConfig::default(),
                existing_hashes: None,
            })
            .await
            .unwrap();

        let responses = drain(rx).await;
        handle.shutdown();

        assert!(matches!(
            responses.last().unwrap(),
            WorkerResponse::Error { .. }
        ));
    }
}
