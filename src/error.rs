/// Centralized error types for code-index using thiserror
///
/// Skippable per-file conditions (oversized, unreadable, zero chunks) are
/// not errors: the worker logs and counts them.
use thiserror::Error;

/// Main error type for the indexing pipeline
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Chunking error: {0}")]
    Chunk(#[from] ChunkError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Errors related to configuration loading and validation
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to load config: {0}")]
    LoadFailed(String),

    #[error("Failed to parse config: {0}")]
    ParseFailed(String),

    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Errors related to parsing and chunking
#[derive(Error, Debug)]
pub enum ChunkError {
    #[error("No grammar registered for extension: {0}")]
    UnsupportedExtension(String),

    #[error("Failed to load grammar for {language}: {reason}")]
    GrammarLoadFailed { language: String, reason: String },

    #[error("Failed to compile structural query for {language}: {reason}")]
    QueryCompileFailed { language: String, reason: String },

    #[error("Failed to parse source file: {0}")]
    ParseFailed(String),
}

/// Errors related to the worker executor and its protocol
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Worker command channel closed")]
    CommandChannelClosed,

    #[error("Workspace is not registered: {0}")]
    WorkspaceNotRegistered(String),

    #[error("Worker task failed: {0}")]
    TaskFailed(String),
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, IndexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IndexError::from(ConfigError::InvalidValue {
            key: "chunk_size".to_string(),
            reason: "must be greater than 0".to_string(),
        });
        assert!(err.to_string().contains("chunk_size"));

        let err = IndexError::from(WorkerError::WorkspaceNotRegistered("/tmp/x".to_string()));
        assert!(err.to_string().contains("/tmp/x"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: IndexError = io.into();
        assert!(matches!(err, IndexError::Io(_)));
    }
}
