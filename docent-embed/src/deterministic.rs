//! Hash-seeded pseudo-random embeddings for offline development.
//!
//! Each text is hashed with 64-bit FNV-1a and the hash seeds a [`StdRng`]
//! that draws `dimension` values uniformly from `[0, 1)`. The same text
//! always yields the same vector, across calls and across runs, so tests
//! and demos can exercise the whole pipeline without network access.
//!
//! The vectors carry no semantic meaning. Only exact-text matches are
//! guaranteed to score highest.

use crate::config::{DEFAULT_DIMENSION, EmbeddingMode};
use crate::error::{EmbedError, Result};
use crate::provider::{EmbeddingProvider, EmbeddingResult};
use async_trait::async_trait;
use fnv::FnvHasher;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hash::Hasher;

/// Embedding provider that derives vectors from a hash of the text.
#[derive(Debug, Clone)]
pub struct DeterministicProvider {
    dimension: usize,
}

impl DeterministicProvider {
    /// Create a provider producing vectors of `dimension` components.
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(EmbedError::invalid_config(
                "deterministic embedding dimension must be positive",
            ));
        }
        Ok(Self { dimension })
    }

    /// Seed derived from the UTF-8 bytes of `text`.
    pub fn seed_for(text: &str) -> u64 {
        let mut hasher = FnvHasher::default();
        hasher.write(text.as_bytes());
        hasher.finish()
    }

    /// Vector for a single text. Pure and synchronous.
    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut rng = StdRng::seed_from_u64(Self::seed_for(text));
        (0..self.dimension).map(|_| rng.r#gen::<f32>()).collect()
    }
}

impl Default for DeterministicProvider {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_DIMENSION,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for DeterministicProvider {
    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult> {
        if texts.is_empty() {
            return Ok(EmbeddingResult::empty());
        }
        tracing::debug!(
            "Generating {} deterministic embeddings of dimension {}",
            texts.len(),
            self.dimension
        );
        let embeddings = texts.iter().map(|t| self.vector_for(t)).collect();
        Ok(EmbeddingResult {
            embeddings,
            dimension: self.dimension,
        })
    }

    fn embedding_dimension(&self) -> Option<usize> {
        Some(self.dimension)
    }

    fn mode(&self) -> EmbeddingMode {
        EmbeddingMode::DeterministicFallback
    }

    fn provider_name(&self) -> &str {
        "deterministic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fnv1a_seed() {
        // Published FNV-1a 64-bit test vectors
        assert_eq!(DeterministicProvider::seed_for(""), 0xcbf29ce484222325);
        assert_eq!(DeterministicProvider::seed_for("a"), 0xaf63dc4c8601ec8c);
    }

    #[test]
    fn test_same_text_same_vector() {
        let provider = DeterministicProvider::new(64).unwrap();
        let a = provider.vector_for("the quick brown fox");
        let b = provider.vector_for("the quick brown fox");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        // A fresh provider (as in another run) gives bit-identical output
        let other = DeterministicProvider::new(64).unwrap();
        let c = other.vector_for("the quick brown fox");
        assert_eq!(
            a.iter().map(|v| v.to_bits()).collect::<Vec<_>>(),
            c.iter().map(|v| v.to_bits()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_different_text_different_vector() {
        let provider = DeterministicProvider::new(32).unwrap();
        assert_ne!(provider.vector_for("alpha"), provider.vector_for("beta"));
    }

    #[test]
    fn test_values_in_unit_interval() {
        let provider = DeterministicProvider::default();
        let v = provider.vector_for("range check");
        assert_eq!(v.len(), 1536);
        assert!(v.iter().all(|x| (0.0..1.0).contains(x)));
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(matches!(
            DeterministicProvider::new(0),
            Err(EmbedError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_batch_matches_single() {
        let provider = DeterministicProvider::new(16).unwrap();
        let texts = vec!["one".to_string(), "two".to_string(), "one".to_string()];
        let result = tokio_test::block_on(provider.embed_texts(&texts)).unwrap();

        assert_eq!(result.len(), 3);
        assert_eq!(result.dimension, 16);
        assert_eq!(result.embeddings[0], provider.vector_for("one"));
        assert_eq!(result.embeddings[1], provider.vector_for("two"));
        assert_eq!(result.embeddings[0], result.embeddings[2]);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let provider = DeterministicProvider::new(16).unwrap();
        let result = provider.embed_texts(&[]).await.unwrap();
        assert!(result.is_empty());
    }
}
