//! # code-index - Semantic Codebase Indexing Pipeline
//!
//! Scans a workspace, splits source files into meaningful chunks via
//! tree-sitter structural queries (with a lexical fallback), computes
//! vector embeddings through a pluggable provider, and keeps a vector
//! store incrementally synchronized with file-system changes so that
//! callers can perform semantic retrieval over the codebase.
//!
//! ## Key Features
//!
//! - **AST-Based Chunking**: Tree-sitter parsing for 12 programming
//!   languages, with a guaranteed lexical fallback for everything else
//! - **Incremental Indexing**: SHA-256 content hashes drive skip,
//!   reprocess and deletion decisions on every pass
//! - **Isolated Worker**: The scan/chunk/embed pipeline runs on a
//!   dedicated task behind a typed message protocol, under a bounded
//!   concurrency cap
//! - **Throttled Progress**: Status updates are broadcast at most every
//!   100ms, with terminal states always delivered
//! - **Hybrid Search**: Vector candidates fused with a keyword ranking
//!   via reciprocal rank fusion
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │   IndexService   │  registry: workspace path → orchestrator
//! └────────┬─────────┘
//!          │
//! ┌────────▼─────────┐   commands    ┌───────────────┐
//! │IndexOrchestrator ├──────────────►│  IndexWorker  │
//! │ status, progress │◄──────────────┤ scan → chunk  │
//! └───┬─────────┬────┘   responses   │ → embed       │
//!     │         │                    └───────────────┘
//! ┌───▼────┐ ┌──▼─────────┐
//! │Vector  │ │ Embedding  │   (external collaborators,
//! │Store   │ │ Client     │    consumed as traits)
//! └────────┘ └────────────┘
//! ```
//!
//! ## Usage Example
//!
//! ```no_run
//! use code_index::config::IndexConfig;
//! use code_index::service::IndexService;
//! # use std::sync::Arc;
//! # async fn example(
//! #     store: Arc<dyn code_index::store::VectorStore>,
//! #     embedder: Arc<dyn code_index::embedding::EmbeddingClient>,
//! # ) -> anyhow::Result<()> {
//! let service = IndexService::new(embedder, IndexConfig::default());
//! let orchestrator = service.register_workspace("/path/to/workspace", store).await?;
//!
//! orchestrator.index_workspace().await?;
//! let results = orchestrator.search("parse configuration", 10).await?;
//! # Ok(())
//! # }
//! ```

/// Code chunking: semantic (tree-sitter) with lexical fallback
pub mod chunk;

/// Configuration with TOML loading and environment overrides
pub mod config;

/// Embedding provider interface
pub mod embedding;

/// Error types and utilities
pub mod error;

/// Content hashing and change classification
pub mod hash;

/// Per-workspace orchestration, status and search
pub mod orchestrator;

/// Path normalization utilities
pub mod paths;

/// Top-level service with the workspace registry
pub mod service;

/// Vector store interface
pub mod store;

/// Worker executor and its message protocol
pub mod worker;
