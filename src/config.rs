/// Configuration for the indexing pipeline
///
/// Supports loading from multiple sources with priority:
/// Environment variables > Config file > Defaults
use crate::error::{ConfigError, IndexError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Immutable per-run configuration for a workspace index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Maximum file size in bytes; larger files are skipped, never chunked
    #[serde(default = "default_max_file_size")]
    pub max_file_size: usize,

    /// File extensions eligible for indexing (lowercase, without dot)
    #[serde(default = "default_included_exts")]
    pub included_exts: BTreeSet<String>,

    /// Directory names excluded from the scan
    #[serde(default = "default_ignored_dirs")]
    pub ignored_dirs: BTreeSet<String>,

    /// Line window for the lexical fallback chunker
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Embedding provider configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

/// Embedding provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model name (e.g., "all-MiniLM-L6-v2")
    #[serde(default = "default_model_name")]
    pub model: String,

    /// Expected vector dimension
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Maximum texts per embed_batch call
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Timeout in seconds for a single embedding call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Partial update for [`IndexConfig`]; `None` fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexConfigPatch {
    pub max_file_size: Option<usize>,
    pub included_exts: Option<BTreeSet<String>>,
    pub ignored_dirs: Option<BTreeSet<String>>,
    pub chunk_size: Option<usize>,
}

/// Partial update for [`EmbeddingConfig`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbeddingConfigPatch {
    pub model: Option<String>,
    pub dimension: Option<usize>,
    pub batch_size: Option<usize>,
    pub timeout_secs: Option<u64>,
}

// Default value functions

fn default_max_file_size() -> usize {
    1_048_576 // 1 MiB
}

fn default_included_exts() -> BTreeSet<String> {
    [
        // Languages with a registered grammar
        "rs", "py", "js", "mjs", "cjs", "jsx", "ts", "tsx", "go", "java", "swift", "c", "h",
        "cpp", "cc", "cxx", "hpp", "hxx", "hh", "cs", "rb", "php",
        // Plain-text formats handled by the lexical fallback
        "md", "json", "toml", "yaml", "yml", "txt",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_ignored_dirs() -> BTreeSet<String> {
    ["target", "node_modules", ".git", "dist", "build"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_chunk_size() -> usize {
    50
}

fn default_model_name() -> String {
    "all-MiniLM-L6-v2".to_string()
}

fn default_dimension() -> usize {
    384
}

fn default_batch_size() -> usize {
    32
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            included_exts: default_included_exts(),
            ignored_dirs: default_ignored_dirs(),
            chunk_size: default_chunk_size(),
            embedding: EmbeddingConfig::default(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_model_name(),
            dimension: default_dimension(),
            batch_size: default_batch_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl IndexConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, IndexError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadFailed(format!("Failed to read config file: {}", e)))?;

        let config: IndexConfig = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseFailed(format!("Invalid TOML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load from a file if it exists, otherwise fall back to defaults
    pub fn load_or_default(path: &Path) -> Result<Self, IndexError> {
        if path.exists() {
            tracing::info!("Loading config from: {}", path.display());
            Self::from_file(path)
        } else {
            tracing::info!("No config file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(size) = std::env::var("CODE_INDEX_MAX_FILE_SIZE")
            && let Ok(size) = size.parse()
        {
            self.max_file_size = size;
        }

        if let Ok(size) = std::env::var("CODE_INDEX_CHUNK_SIZE")
            && let Ok(size) = size.parse()
        {
            self.chunk_size = size;
        }

        if let Ok(model) = std::env::var("CODE_INDEX_MODEL") {
            self.embedding.model = model;
        }

        if let Ok(batch_size) = std::env::var("CODE_INDEX_BATCH_SIZE")
            && let Ok(size) = batch_size.parse()
        {
            self.embedding.batch_size = size;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), IndexError> {
        if self.max_file_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_file_size".to_string(),
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "chunk_size".to_string(),
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        if self.included_exts.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "included_exts".to_string(),
                reason: "must contain at least one extension".to_string(),
            }
            .into());
        }

        if self.embedding.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "embedding.batch_size".to_string(),
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        if self.embedding.dimension == 0 {
            return Err(ConfigError::InvalidValue {
                key: "embedding.dimension".to_string(),
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// Apply a partial update, returning the merged configuration
    pub fn patched(&self, patch: IndexConfigPatch) -> Self {
        let mut next = self.clone();
        if let Some(v) = patch.max_file_size {
            next.max_file_size = v;
        }
        if let Some(v) = patch.included_exts {
            next.included_exts = v;
        }
        if let Some(v) = patch.ignored_dirs {
            next.ignored_dirs = v;
        }
        if let Some(v) = patch.chunk_size {
            next.chunk_size = v;
        }
        next
    }
}

impl EmbeddingConfig {
    /// Apply a partial update, returning the merged configuration
    pub fn patched(&self, patch: EmbeddingConfigPatch) -> Self {
        let mut next = self.clone();
        if let Some(v) = patch.model {
            next.model = v;
        }
        if let Some(v) = patch.dimension {
            next.dimension = v;
        }
        if let Some(v) = patch.batch_size {
            next.batch_size = v;
        }
        if let Some(v) = patch.timeout_secs {
            next.timeout_secs = v;
        }
        next
    }
}
