//! Embedding provider trait and construction

use crate::config::{EmbedConfig, EmbeddingMode};
use crate::deterministic::DeterministicProvider;
use crate::error::Result;
use crate::openai::OpenAiProvider;
use async_trait::async_trait;
use std::sync::Arc;

/// Result of embedding generation
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingResult {
    /// The generated embeddings, one per input text
    pub embeddings: Vec<Vec<f32>>,
    /// The dimension of each embedding vector
    pub dimension: usize,
}

impl EmbeddingResult {
    /// Create a new embedding result from a vector of embeddings.
    ///
    /// The dimension is inferred from the first embedding vector.
    /// If the embeddings vector is empty, dimension defaults to 0.
    ///
    /// # Arguments
    /// * `embeddings` - Vector of embedding vectors, where each inner vector represents
    ///   the embedding for one input text
    pub fn new(embeddings: Vec<Vec<f32>>) -> Self {
        let dimension = embeddings.first().map(|e| e.len()).unwrap_or(0);
        Self {
            embeddings,
            dimension,
        }
    }

    /// An empty result, as returned for an empty input.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Returns the number of embedding vectors in this result.
    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    /// Returns `true` if this result contains no embedding vectors.
    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }

    /// Returns `true` when every vector has the same length as the first.
    pub fn is_rectangular(&self) -> bool {
        self.embeddings.iter().all(|e| e.len() == self.dimension)
    }
}

/// Trait for embedding providers that can generate embeddings from text
///
/// Implementations must return exactly one vector per input text, in input
/// order, or an error. Partial results are never returned.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embeddings for multiple texts (batch processing)
    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult>;

    /// Generate embeddings for a single text
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let result = self.embed_texts(&[text.to_string()]).await?;
        let actual = result.len();
        match <[Vec<f32>; 1]>::try_from(result.embeddings) {
            Ok([embedding]) => Ok(embedding),
            Err(_) => Err(crate::error::EmbedError::CountMismatch {
                expected: 1,
                actual,
            }),
        }
    }

    /// Get the dimension of embeddings produced by this provider, if known yet
    fn embedding_dimension(&self) -> Option<usize>;

    /// The mode this provider implements
    fn mode(&self) -> EmbeddingMode;

    /// Get the name/identifier of this provider
    fn provider_name(&self) -> &str;
}

/// Build the provider selected by `config.mode`.
///
/// This is the only place the embedding strategy is chosen. The
/// configuration is validated first; a missing API key is left for the live
/// provider to report on its first call.
pub fn create_provider(config: &EmbedConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    config.validate()?;
    let provider: Arc<dyn EmbeddingProvider> = match config.mode {
        EmbeddingMode::Live => Arc::new(OpenAiProvider::new(config.clone())?),
        EmbeddingMode::DeterministicFallback => {
            Arc::new(DeterministicProvider::new(config.dimension)?)
        }
    };
    tracing::info!(
        "Created {} embedding provider ({})",
        provider.provider_name(),
        config.mode
    );
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_result() {
        let result = EmbeddingResult::new(vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        assert_eq!(result.len(), 2);
        assert_eq!(result.dimension, 2);
        assert!(result.is_rectangular());
        assert!(!result.is_empty());

        let ragged = EmbeddingResult::new(vec![vec![1.0, 2.0], vec![3.0]]);
        assert!(!ragged.is_rectangular());

        let empty = EmbeddingResult::empty();
        assert!(empty.is_empty());
        assert_eq!(empty.dimension, 0);
    }

    #[test]
    fn test_create_provider_selects_mode() {
        let provider = create_provider(&EmbedConfig::deterministic(16)).unwrap();
        assert_eq!(provider.mode(), EmbeddingMode::DeterministicFallback);
        assert_eq!(provider.embedding_dimension(), Some(16));

        // No key configured: construction still succeeds
        let provider = create_provider(&EmbedConfig::default()).unwrap();
        assert_eq!(provider.mode(), EmbeddingMode::Live);
        assert_eq!(provider.embedding_dimension(), None);
    }

    #[test]
    fn test_create_provider_rejects_invalid_config() {
        assert!(create_provider(&EmbedConfig::deterministic(0)).is_err());
        assert!(create_provider(&EmbedConfig::default().with_batch_size(0)).is_err());
    }

    #[tokio::test]
    async fn test_embed_text_defaults_to_batch_call() {
        let provider = create_provider(&EmbedConfig::deterministic(8)).unwrap();
        let single = provider.embed_text("hello").await.unwrap();
        let batch = provider.embed_texts(&["hello".to_string()]).await.unwrap();
        assert_eq!(single, batch.embeddings[0]);
    }
}
