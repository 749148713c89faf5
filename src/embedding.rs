/// Embedding provider interface
///
/// Providers (HTTP clients, local models) live outside this crate; the
/// pipeline only consumes this trait.
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Outcome of an embedding provider connectivity check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

/// Trait for embedding generation
#[async_trait::async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Embed a single text (used for queries on the orchestration side)
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of texts in one provider call.
    ///
    /// The result has one entry per input, in order. A `None` entry means
    /// the provider produced no vector for that text; the caller drops the
    /// corresponding chunk silently rather than failing the batch.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Option<Vec<f32>>>>;

    /// Check provider reachability
    async fn test_connection(&self) -> ConnectionStatus;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_status_serialization() {
        let ok = ConnectionStatus {
            success: true,
            error: None,
            latency_ms: Some(12),
        };
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["latency_ms"], 12);
        assert!(json.get("error").is_none());

        let failed = ConnectionStatus {
            success: false,
            error: Some("connection refused".to_string()),
            latency_ms: None,
        };
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "connection refused");
    }
}
