//! Configuration for embedding providers

use crate::error::{EmbedError, Result};
use serde::{Deserialize, Serialize};

/// Default OpenAI-compatible endpoint base.
pub const DEFAULT_API_BASE: &str = "https://api.deepseek.com/v1";
/// Default embedding model name.
pub const DEFAULT_MODEL_NAME: &str = "deepseek-text";
/// Largest batch the live endpoint accepts in one request.
pub const MAX_BATCH_SIZE: usize = 64;
/// Default dimension for deterministic fallback vectors.
pub const DEFAULT_DIMENSION: usize = 1536;
/// Default request timeout, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// How embeddings are produced.
///
/// The mode is chosen once by configuration and never by probing the
/// environment at call time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmbeddingMode {
    /// Call the remote OpenAI-compatible embedding service.
    #[default]
    Live,
    /// Derive pseudo-random vectors from a hash of the text. For development and tests.
    DeterministicFallback,
}

impl EmbeddingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbeddingMode::Live => "live",
            EmbeddingMode::DeterministicFallback => "deterministic-fallback",
        }
    }
}

impl std::fmt::Display for EmbeddingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for embedding providers.
///
/// Deserializes from the `[embedding]` table of the engine configuration file.
/// Every field has a default, so an empty table is valid.
///
/// The API key is never serialized and is redacted from `Debug` output.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedConfig {
    /// Which provider to build
    pub mode: EmbeddingMode,
    /// Model name sent with every live request
    pub model_name: String,
    /// Base URL of the OpenAI-compatible API, without the `/embeddings` suffix
    pub api_base: String,
    /// Bearer token for the live API
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Texts per live request, within `1..=64`
    pub batch_size: usize,
    /// Vector dimension of the deterministic fallback
    pub dimension: usize,
    /// Live request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            mode: EmbeddingMode::Live,
            model_name: DEFAULT_MODEL_NAME.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: None,
            batch_size: MAX_BATCH_SIZE,
            dimension: DEFAULT_DIMENSION,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl std::fmt::Debug for EmbedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbedConfig")
            .field("mode", &self.mode)
            .field("model_name", &self.model_name)
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("batch_size", &self.batch_size)
            .field("dimension", &self.dimension)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl EmbedConfig {
    /// Live configuration against the default endpoint with the given key.
    pub fn live<S: Into<String>>(api_key: S) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    /// Deterministic fallback configuration with the given vector dimension.
    pub fn deterministic(dimension: usize) -> Self {
        Self {
            mode: EmbeddingMode::DeterministicFallback,
            dimension,
            ..Self::default()
        }
    }

    /// Set the embedding mode (builder style)
    pub fn with_mode(self, mode: EmbeddingMode) -> Self {
        Self { mode, ..self }
    }

    /// Set the model name (builder style)
    pub fn with_model_name<S: Into<String>>(self, model_name: S) -> Self {
        Self {
            model_name: model_name.into(),
            ..self
        }
    }

    /// Set the API base URL (builder style)
    pub fn with_api_base<S: Into<String>>(self, api_base: S) -> Self {
        Self {
            api_base: api_base.into(),
            ..self
        }
    }

    /// Set the API key (builder style)
    pub fn with_api_key<S: Into<String>>(self, api_key: S) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..self
        }
    }

    /// Set the batch size for live requests (builder style)
    pub fn with_batch_size(self, batch_size: usize) -> Self {
        Self { batch_size, ..self }
    }

    /// Set the fallback vector dimension (builder style)
    pub fn with_dimension(self, dimension: usize) -> Self {
        Self { dimension, ..self }
    }

    /// Set the request timeout in seconds (builder style)
    pub fn with_timeout_secs(self, timeout_secs: u64) -> Self {
        Self {
            timeout_secs,
            ..self
        }
    }

    /// Batch size clamped into the range the live endpoint accepts.
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.clamp(1, MAX_BATCH_SIZE)
    }

    /// Endpoint URL for embedding requests.
    pub fn embeddings_url(&self) -> String {
        format!("{}/embeddings", self.api_base.trim_end_matches('/'))
    }

    /// True when a non-empty API key is configured.
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    /// Check the settings that are invalid regardless of mode.
    ///
    /// A missing API key is not reported here: live providers check it at
    /// their first call so that a misconfigured key surfaces as an embedding
    /// failure rather than a startup failure.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            return Err(EmbedError::invalid_config(format!(
                "batch_size must be between 1 and {MAX_BATCH_SIZE}, got {}",
                self.batch_size
            )));
        }
        if self.dimension == 0 {
            return Err(EmbedError::invalid_config("dimension must be positive"));
        }
        if self.timeout_secs == 0 {
            return Err(EmbedError::invalid_config("timeout_secs must be positive"));
        }
        if self.mode == EmbeddingMode::Live {
            if self.model_name.trim().is_empty() {
                return Err(EmbedError::invalid_config("model_name must not be empty"));
            }
            if !(self.api_base.starts_with("http://") || self.api_base.starts_with("https://")) {
                return Err(EmbedError::invalid_config(format!(
                    "api_base must be an http(s) URL, got {:?}",
                    self.api_base
                )));
            }
        }

        tracing::debug!("Embedding configuration valid for mode {}", self.mode);
        Ok(())
    }
}
