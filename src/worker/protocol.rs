/// Typed command/response protocol between orchestrator and worker
///
/// Values are moved across the task boundary, never shared by reference.
/// The serde shapes are part of the contract: tags and field names match
/// the wire format exactly, and the prior hash map travels as plain
/// ordered key/value pairs rather than a native map type.
use crate::chunk::IndexedChunk;
use crate::config::IndexConfig;
use serde::{Deserialize, Serialize};

/// Commands accepted by the worker
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerCommand {
    /// Full workspace scan, with optional prior hashes for incremental skip
    Index {
        workspace_path: String,
        config: IndexConfig,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        existing_hashes: Option<Vec<(String, String)>>,
    },
    /// Re-process a single file
    Update {
        workspace_path: String,
        file: String,
        config: IndexConfig,
    },
    /// Re-process a list of files at reduced concurrency
    BatchUpdate {
        workspace_path: String,
        files: Vec<String>,
        config: IndexConfig,
    },
}

/// Per-file entry inside a batch update response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileUpdate {
    pub file_path: String,
    pub chunks: Vec<IndexedChunk>,
    pub deleted: bool,
}

/// Responses emitted by the worker
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerResponse {
    /// Lightweight progress ping, no chunks attached
    Progress { processed: usize, total: usize },
    /// A flushed batch of indexed chunks
    Result {
        chunks: Vec<IndexedChunk>,
        processed: usize,
        total: usize,
    },
    /// Outcome for one file; `deleted` covers vanished files and
    /// zero-chunk results
    UpdateResult {
        file_path: String,
        chunks: Vec<IndexedChunk>,
        deleted: bool,
    },
    /// Aggregated outcome of a batch update, one entry per requested file
    BatchUpdateResult { results: Vec<FileUpdate> },
    /// Terminal: run finished
    Complete { total_chunks: usize },
    /// Terminal: run failed
    Error { error: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{ChunkKind, CodeChunk};

    fn sample_chunk() -> IndexedChunk {
        IndexedChunk {
            chunk: CodeChunk {
                id: "src/a.rs:1-4:abcd1234".to_string(),
                file_path: "/ws/src/a.rs".to_string(),
                relative_path: "src/a.rs".to_string(),
                file_hash: "abcd1234".to_string(),
                content: "fn a() {\n    1\n}\n".to_string(),
                start_line: 1,
                end_line: 4,
                kind: ChunkKind::Function,
                language: "Rust".to_string(),
                symbols: vec!["a".to_string()],
            },
            vector: vec![0.1, 0.2],
        }
    }

    #[test]
    fn test_command_tags() {
        let cmd = WorkerCommand::Index {
            workspace_path: "/ws".to_string(),
            config: IndexConfig::default(),
            existing_hashes: Some(vec![("src/a.rs".to_string(), "h1".to_string())]),
        };
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["type"], "index");
        assert_eq!(json["workspace_path"], "/ws");
        assert_eq!(json["existing_hashes"][0][0], "src/a.rs");

        let cmd = WorkerCommand::BatchUpdate {
            workspace_path: "/ws".to_string(),
            files: vec!["a.rs".to_string()],
            config: IndexConfig::default(),
        };
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["type"], "batch_update");
    }

    #[test]
    fn test_index_without_hashes_omits_field() {
        let cmd = WorkerCommand::Index {
            workspace_path: "/ws".to_string(),
            config: IndexConfig::default(),
            existing_hashes: None,
        };
        let json = serde_json::to_value(&cmd).unwrap();
        assert!(json.get("existing_hashes").is_none());
    }

    #[test]
    fn test_response_tags() {
        let resp = WorkerResponse::Progress {
            processed: 3,
            total: 10,
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["type"], "progress");

        let resp = WorkerResponse::UpdateResult {
            file_path: "src/a.rs".to_string(),
            chunks: vec![],
            deleted: true,
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["type"], "update_result");
        assert_eq!(json["deleted"], true);

        let resp = WorkerResponse::BatchUpdateResult { results: vec![] };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["type"], "batch_update_result");

        let resp = WorkerResponse::Complete { total_chunks: 42 };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["type"], "complete");
        assert_eq!(json["total_chunks"], 42);
    }

    #[test]
    fn test_result_roundtrip_with_chunks() {
        let resp = WorkerResponse::Result {
            chunks: vec![sample_chunk()],
            processed: 1,
            total: 2,
        };

        let json = serde_json::to_string(&resp).unwrap();
        let parsed: WorkerResponse = serde_json::from_str(&json).unwrap();
        match parsed {
            WorkerResponse::Result {
                chunks,
                processed,
                total,
            } => {
                assert_eq!(chunks.len(), 1);
                assert_eq!(chunks[0].chunk.kind, ChunkKind::Function);
                assert_eq!(chunks[0].vector, vec![0.1, 0.2]);
                assert_eq!((processed, total), (1, 2));
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[test]
    fn test_indexed_chunk_flattens_fields() {
        let json = serde_json::to_value(sample_chunk()).unwrap();
        // chunk fields sit at the top level next to the vector
        assert_eq!(json["relative_path"], "src/a.rs");
        assert_eq!(json["kind"], "function");
        assert!(json["vector"].is_array());
    }
}
