//! Error types for kgmemory
//!
//! One error enum for every layer: configuration, the LLM and embedding
//! collaborators, the graph adapters and the reconciliation step.

use thiserror::Error;

/// Main error type for the graph memory layer
#[derive(Error, Debug)]
pub enum MemoryError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Provider name not handled by any factory
    #[error("Unsupported {kind} provider: {name}")]
    UnsupportedProvider { kind: &'static str, name: String },

    /// LLM API errors
    #[error("LLM API error: {0}")]
    LlmApiError(String),

    /// Embedding API errors
    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    /// Graph database errors
    #[error("Graph query error: {0}")]
    GraphError(String),

    /// Tool call returned by the LLM could not be decoded
    #[error("Invalid tool call '{name}': {reason}")]
    ToolCall { name: String, reason: String },

    /// Relationship update produced no edge
    #[error("Failed to update or create relationship between {source_node} and {target_node}")]
    RelationshipUpdateFailed {
        source_node: String,
        target_node: String,
    },

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Redis transport errors (FalkorDB)
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic errors with context
    #[error("Memory error: {0}")]
    Generic(String),
}

/// Result type alias for memory operations
pub type Result<T> = std::result::Result<T, MemoryError>;

/// Convert anyhow errors to MemoryError
impl From<anyhow::Error> for MemoryError {
    fn from(err: anyhow::Error) -> Self {
        MemoryError::Generic(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MemoryError::RelationshipUpdateFailed {
            source_node: "alice".to_string(),
            target_node: "acme".to_string(),
        };
        assert!(err.to_string().contains("alice"));
        assert!(err.to_string().contains("acme"));
    }

    #[test]
    fn test_unsupported_provider_error() {
        let err = MemoryError::UnsupportedProvider {
            kind: "graph",
            name: "memgraph".to_string(),
        };
        assert_eq!(err.to_string(), "Unsupported graph provider: memgraph");
    }

    #[test]
    fn test_from_anyhow() {
        let err: MemoryError = anyhow::anyhow!("boom").into();
        assert!(matches!(err, MemoryError::Generic(ref m) if m == "boom"));
    }
}
