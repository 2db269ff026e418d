//! In-memory vector index and the retriever that queries it.
//!
//! A [`VectorIndex`] pairs every chunk with one embedding row and answers
//! top-K cosine-similarity queries by exhaustive scan. It is immutable once
//! built. A [`Retriever`] bundles an index with the provider that embedded
//! it, so queries are always embedded the same way as the chunks were.

use crate::error::{Result, RetrieverError};
use chrono::{DateTime, Utc};
use docent_context::TextChunk;
use docent_embed::{EmbeddingMode, EmbeddingProvider};
use serde::Serialize;
use std::sync::Arc;

/// A chunk returned by a query, with its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredChunk {
    pub chunk: TextChunk,
    /// Cosine similarity in `[-1, 1]`; 0 when either vector has zero norm
    pub similarity: f32,
}

/// Chunks and their embeddings, row-aligned.
///
/// Embeddings are stored as one row-major matrix with the norm of every row
/// computed once at build time.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    chunks: Vec<TextChunk>,
    matrix: Vec<f32>,
    norms: Vec<f64>,
    dimension: usize,
}

impl VectorIndex {
    /// An index with no rows.
    pub fn empty() -> Self {
        Self {
            chunks: Vec::new(),
            matrix: Vec::new(),
            norms: Vec::new(),
            dimension: 0,
        }
    }

    /// Pair chunks with embeddings.
    ///
    /// Fails when the counts differ or when the rows do not all share one
    /// non-zero length.
    pub fn new(chunks: Vec<TextChunk>, embeddings: Vec<Vec<f32>>) -> Result<Self> {
        if chunks.len() != embeddings.len() {
            return Err(RetrieverError::index_build(format!(
                "{} chunks but {} embeddings",
                chunks.len(),
                embeddings.len()
            )));
        }
        let Some(first) = embeddings.first() else {
            return Ok(Self::empty());
        };

        let dimension = first.len();
        if dimension == 0 {
            return Err(RetrieverError::index_build("embeddings have zero length"));
        }
        if let Some((row, bad)) = embeddings
            .iter()
            .enumerate()
            .find(|(_, e)| e.len() != dimension)
        {
            return Err(RetrieverError::index_build(format!(
                "embedding row {row} has length {} but the index dimension is {dimension}",
                bad.len()
            )));
        }

        let norms = embeddings.iter().map(|row| norm(row)).collect();
        let matrix = embeddings.into_iter().flatten().collect();

        Ok(Self {
            chunks,
            matrix,
            norms,
            dimension,
        })
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Vector dimension, 0 for an empty index.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn chunks(&self) -> &[TextChunk] {
        &self.chunks
    }

    /// The `k` chunks most similar to `query`, best first.
    ///
    /// Ties keep index order. Asking for more than the index holds returns
    /// every chunk; `k = 0` or an empty index returns nothing.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        self.search_with_threshold(query, k, None)
    }

    /// Like [`search`](Self::search), dropping results below `min_similarity`.
    pub fn search_with_threshold(
        &self,
        query: &[f32],
        k: usize,
        min_similarity: Option<f32>,
    ) -> Result<Vec<ScoredChunk>> {
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(RetrieverError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let query_norm = norm(query);
        let mut scored: Vec<(usize, f32)> = self
            .matrix
            .chunks_exact(self.dimension)
            .zip(&self.norms)
            .enumerate()
            .map(|(row, (embedding, &row_norm))| {
                (row, similarity(dot(query, embedding), query_norm, row_norm))
            })
            .filter(|(_, score)| min_similarity.is_none_or(|min| *score >= min))
            .collect();

        // Stable sort: equal scores stay in insertion order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(row, similarity)| ScoredChunk {
                chunk: self.chunks[row].clone(),
                similarity,
            })
            .collect())
    }
}

/// Cosine similarity of two equal-length vectors; 0 if either has zero norm.
///
/// Sums are accumulated in `f64`, so large finite components do not
/// overflow. A non-finite result (from NaN or infinite input) scores 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    similarity(dot(a, b), norm(a), norm(b))
}

fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter().zip(b).map(|(&x, &y)| x as f64 * y as f64).sum()
}

fn norm(v: &[f32]) -> f64 {
    v.iter().map(|&x| x as f64 * x as f64).sum::<f64>().sqrt()
}

fn similarity(dot: f64, norm_a: f64, norm_b: f64) -> f32 {
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let cosine = dot / (norm_a * norm_b);
    if cosine.is_finite() {
        cosine.clamp(-1.0, 1.0) as f32
    } else {
        0.0
    }
}

/// Summary of a built index.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub chunks: usize,
    pub dimension: usize,
    pub sources: usize,
    pub mode: EmbeddingMode,
    pub built_at: DateTime<Utc>,
}

/// A built index plus the provider used to embed queries against it.
///
/// Cloning is cheap and clones share the same index.
#[derive(Clone)]
pub struct Retriever {
    index: Arc<VectorIndex>,
    provider: Arc<dyn EmbeddingProvider>,
    built_at: DateTime<Utc>,
}

impl std::fmt::Debug for Retriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("chunks", &self.index.len())
            .field("dimension", &self.index.dimension())
            .field("provider", &self.provider.provider_name())
            .field("built_at", &self.built_at)
            .finish()
    }
}

impl Retriever {
    /// Embed every chunk in one provider call and index the result.
    ///
    /// No chunks means no provider call and an empty index.
    pub async fn build(
        chunks: Vec<TextChunk>,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        if chunks.is_empty() {
            return Ok(Self::from_index(VectorIndex::empty(), provider));
        }

        tracing::info!(
            "Embedding {} chunks with {}",
            chunks.len(),
            provider.provider_name()
        );
        let texts: Vec<String> = chunks.iter().map(|c| c.chunk_text.clone()).collect();
        let result = provider.embed_texts(&texts).await?;

        if result.len() != chunks.len() {
            return Err(RetrieverError::index_build(format!(
                "provider returned {} embeddings for {} chunks",
                result.len(),
                chunks.len()
            )));
        }

        let index = VectorIndex::new(chunks, result.embeddings)?;
        tracing::info!(
            "Built index of {} chunks with dimension {}",
            index.len(),
            index.dimension()
        );
        Ok(Self::from_index(index, provider))
    }

    /// Wrap an existing index. Queries will be embedded with `provider`.
    pub fn from_index(index: VectorIndex, provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            index: Arc::new(index),
            provider,
            built_at: Utc::now(),
        }
    }

    /// Embed `query` and return the `k` most similar chunks.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        self.retrieve_with_threshold(query, k, None).await
    }

    /// Like [`retrieve`](Self::retrieve), dropping results below `min_similarity`.
    pub async fn retrieve_with_threshold(
        &self,
        query: &str,
        k: usize,
        min_similarity: Option<f32>,
    ) -> Result<Vec<ScoredChunk>> {
        if k == 0 || self.index.is_empty() {
            return Ok(Vec::new());
        }
        let embedding = self.provider.embed_text(query).await?;
        self.index.search_with_threshold(&embedding, k, min_similarity)
    }

    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    pub fn mode(&self) -> EmbeddingMode {
        self.provider.mode()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn stats(&self) -> IndexStats {
        let mut sources: Vec<&str> = self
            .index
            .chunks()
            .iter()
            .map(|c| c.source_path.as_str())
            .collect();
        sources.sort_unstable();
        sources.dedup();

        IndexStats {
            chunks: self.index.len(),
            dimension: self.index.dimension(),
            sources: sources.len(),
            mode: self.mode(),
            built_at: self.built_at,
        }
    }
}
