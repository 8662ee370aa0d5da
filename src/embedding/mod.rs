//! Embedding clients
//!
//! Maps entity names to dense vectors. Similarity between vectors is computed
//! by the graph backend, so the only contract here is `text → Vec<f32>`.

pub mod hash;
pub mod ollama;
pub mod openai;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::EmbedderConfig;
use crate::errors::{MemoryError, Result};
use crate::llm::ollama::DEFAULT_OLLAMA_URL;
use crate::llm::openai::DEFAULT_OPENAI_URL;

pub use hash::HashEmbedder;
pub use ollama::OllamaEmbedder;
pub use openai::OpenAiEmbedder;

/// Text embedding backend
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Model identifier
    fn model_name(&self) -> &str;
}

/// Build the embedder named by `config.provider`
pub fn create_embedder(config: &EmbedderConfig) -> Result<Arc<dyn Embedder>> {
    let timeout = Duration::from_secs(config.timeout_secs);

    match config.provider.as_str() {
        "ollama" => Ok(Arc::new(OllamaEmbedder::with_config(
            config.base_url.as_deref().unwrap_or(DEFAULT_OLLAMA_URL),
            &config.model,
            timeout,
        )?)),
        "openai" => Ok(Arc::new(OpenAiEmbedder::with_config(
            config.base_url.as_deref().unwrap_or(DEFAULT_OPENAI_URL),
            &config.model,
            config.resolved_api_key(),
            timeout,
        )?)),
        "hash" => Ok(Arc::new(HashEmbedder::new(config.dimensions))),
        other => Err(MemoryError::UnsupportedProvider {
            kind: "embedder",
            name: other.to_string(),
        }),
    }
}

/// Cosine similarity; zero when either vector has no magnitude or sizes differ
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f64 = a.iter().zip(b).map(|(x, y)| *x as f64 * *y as f64).sum();
    let norm_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Reject empty vectors returned by a provider
pub(crate) fn ensure_non_empty(vector: Vec<f32>, model: &str) -> Result<Vec<f32>> {
    if vector.is_empty() {
        return Err(MemoryError::EmbeddingError(format!(
            "model {} returned an empty embedding",
            model
        )));
    }
    Ok(vector)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = [1.0, 0.0, 0.0];
        let b = [1.0, 0.0, 0.0];
        let c = [0.0, 1.0, 0.0];

        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-9);
        assert!(cosine_similarity(&a, &c).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_similarity_degenerate() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_factory() {
        let mut config = EmbedderConfig::default();
        assert_eq!(create_embedder(&config).unwrap().model_name(), "nomic-embed-text");

        config.provider = "hash".to_string();
        assert_eq!(create_embedder(&config).unwrap().model_name(), "hash-embedding");

        config.provider = "word2vec".to_string();
        assert!(create_embedder(&config).is_err());
    }
}
