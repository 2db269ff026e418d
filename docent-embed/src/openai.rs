//! Live embeddings from an OpenAI-compatible `/embeddings` endpoint.

use crate::config::{EmbedConfig, EmbeddingMode};
use crate::error::{EmbedError, Result};
use crate::provider::{EmbeddingProvider, EmbeddingResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: Option<usize>,
}

/// Embedding provider backed by a remote OpenAI-compatible API.
///
/// Inputs are sent in batches of at most `batch_size` texts (never more than
/// 64). The vector dimension is unknown until the first response arrives;
/// after that every vector must match it.
///
/// The API key is checked at the first call, not at construction, so an
/// engine can be built without credentials and fail only when it needs
/// embeddings.
pub struct OpenAiProvider {
    client: reqwest::Client,
    config: EmbedConfig,
    url: String,
    dimension: OnceLock<usize>,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("config", &self.config)
            .field("url", &self.url)
            .field("dimension", &self.dimension.get())
            .finish()
    }
}

impl OpenAiProvider {
    /// Create a provider with its own HTTP client using the configured timeout.
    pub fn new(config: EmbedConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|source| EmbedError::Request { source })?;
        Ok(Self::with_client(config, client))
    }

    /// Create a provider that sends requests through `client`.
    ///
    /// The configured timeout is still applied to every request.
    pub fn with_client(config: EmbedConfig, client: reqwest::Client) -> Self {
        let url = config.embeddings_url();
        Self {
            client,
            config,
            url,
            dimension: OnceLock::new(),
        }
    }

    pub fn config(&self) -> &EmbedConfig {
        &self.config
    }

    fn api_key(&self) -> Result<&str> {
        match self.config.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(EmbedError::MissingApiKey),
        }
    }

    async fn embed_batch(&self, api_key: &str, batch: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            model: &self.config.model_name,
            input: batch,
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(api_key)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .json(&request)
            .send()
            .await
            .map_err(|e| EmbedError::from_transport(e, self.config.timeout_secs))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| EmbedError::from_transport(e, self.config.timeout_secs))?;

        if !status.is_success() {
            return Err(EmbedError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: EmbeddingResponse =
            serde_json::from_str(&body).map_err(|e| EmbedError::malformed(e.to_string()))?;

        if parsed.data.len() != batch.len() {
            return Err(EmbedError::CountMismatch {
                expected: batch.len(),
                actual: parsed.data.len(),
            });
        }

        order_by_index(parsed.data)
    }

    fn check_dimension(&self, embeddings: &[Vec<f32>]) -> Result<()> {
        let Some(first) = embeddings.first() else {
            return Ok(());
        };
        if first.is_empty() {
            return Err(EmbedError::malformed("embedding vectors are empty"));
        }
        let expected = *self.dimension.get_or_init(|| {
            tracing::debug!("Learned embedding dimension {}", first.len());
            first.len()
        });
        match embeddings.iter().find(|e| e.len() != expected) {
            Some(bad) => Err(EmbedError::DimensionMismatch {
                expected,
                actual: bad.len(),
            }),
            None => Ok(()),
        }
    }
}

/// Put response rows into request order using their `index` field.
///
/// Rows without an index are taken in the order received. Indexes that are
/// out of range or repeated make the response unusable.
fn order_by_index(data: Vec<EmbeddingData>) -> Result<Vec<Vec<f32>>> {
    if data.iter().all(|d| d.index.is_none()) {
        return Ok(data.into_iter().map(|d| d.embedding).collect());
    }

    let len = data.len();
    let mut slots: Vec<Option<Vec<f32>>> = vec![None; len];
    for (position, row) in data.into_iter().enumerate() {
        let index = row.index.unwrap_or(position);
        let Some(slot) = slots.get_mut(index) else {
            return Err(EmbedError::malformed(format!(
                "embedding index {index} out of range for {len} inputs"
            )));
        };
        if slot.is_some() {
            return Err(EmbedError::malformed(format!(
                "duplicate embedding index {index}"
            )));
        }
        *slot = Some(row.embedding);
    }
    // Every slot is filled: len rows went into len distinct slots
    Ok(slots.into_iter().flatten().collect())
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult> {
        if texts.is_empty() {
            return Ok(EmbeddingResult::empty());
        }
        let api_key = self.api_key()?;
        let batch_size = self.config.effective_batch_size();

        tracing::info!(
            "Embedding {} texts with {} in batches of {}",
            texts.len(),
            self.config.model_name,
            batch_size
        );

        let mut embeddings = Vec::with_capacity(texts.len());
        for (batch_number, batch) in texts.chunks(batch_size).enumerate() {
            tracing::debug!("Sending embedding batch {} ({} texts)", batch_number, batch.len());
            let vectors = self.embed_batch(api_key, batch).await?;
            self.check_dimension(&vectors)?;
            embeddings.extend(vectors);
        }

        Ok(EmbeddingResult::new(embeddings))
    }

    fn embedding_dimension(&self) -> Option<usize> {
        self.dimension.get().copied()
    }

    fn mode(&self) -> EmbeddingMode {
        EmbeddingMode::Live
    }

    fn provider_name(&self) -> &str {
        "openai-compatible"
    }
}
