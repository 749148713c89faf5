/// Vector store interface
///
/// The persistence engine is an external collaborator; this crate reads
/// its hash map at run start and writes derived chunks, never touching its
/// internals. Hashes cross the interface as plain ordered key/value pairs.
use crate::chunk::IndexedChunk;
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Aggregate statistics reported by the store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreStats {
    pub chunk_count: usize,
    pub file_count: usize,
}

/// A single vector-search hit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub file_path: String,
    pub content: String,
    pub score: f32,
    pub start_line: usize,
    pub end_line: usize,
    pub language: String,
}

/// Trait for the persistent chunk+vector store
#[async_trait::async_trait]
pub trait VectorStore: Send + Sync {
    /// Initialize the backing storage (idempotent)
    async fn initialize(&self) -> Result<()>;

    /// Whether any index data exists
    async fn has_index(&self) -> Result<bool>;

    /// Current aggregate statistics
    async fn get_stats(&self) -> Result<StoreStats>;

    /// Hash of each indexed file at the last successful index,
    /// as (relative path, hash) pairs
    async fn get_file_hashes(&self) -> Result<Vec<(String, String)>>;

    /// Append a batch of freshly indexed chunks
    async fn add_batch(&self, chunks: Vec<IndexedChunk>) -> Result<()>;

    /// Replace all chunks for one file
    async fn upsert_file(&self, file_path: &str, chunks: Vec<IndexedChunk>) -> Result<()>;

    /// Remove all chunks for one file
    async fn delete_file(&self, file_path: &str) -> Result<()>;

    /// Nearest-neighbor search over stored vectors
    async fn search(&self, vector: Vec<f32>, top_k: usize) -> Result<Vec<SearchResult>>;

    /// Drop all stored data
    async fn clear(&self) -> Result<()>;
}
