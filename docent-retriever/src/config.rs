//! Engine configuration, loadable from a TOML file.
//!
//! ```toml
//! knowledge_base_directory = "data"
//! top_k = 3
//!
//! [chunking]
//! chunk_size = 1000
//! chunk_overlap = 200
//! strategy = "recursive"
//!
//! [embedding]
//! mode = "live"
//! model_name = "deepseek-text"
//! api_base = "https://api.deepseek.com/v1"
//! batch_size = 64
//! timeout_secs = 30
//! ```
//!
//! Every key is optional. Environment variables are only consulted when
//! [`EngineConfig::apply_env`] is called.

use crate::error::{Result, RetrieverError};
use crate::retrieval::chunking_strategy::ChunkingConfig;
use docent_embed::{EmbedConfig, EmbeddingMode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// API key for the live embedding endpoint.
pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
/// Override for the live endpoint base URL.
pub const ENV_API_BASE: &str = "OPENAI_API_BASE";
/// Set to `1` to use deterministic fallback embeddings.
pub const ENV_USE_RANDOM_EMBEDDINGS: &str = "RAG_USE_RANDOM_EMBEDDINGS";
/// Dimension of the fallback vectors.
pub const ENV_FAKE_EMB_DIM: &str = "RAG_FAKE_EMB_DIM";

/// Configuration for the retrieval engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory scanned for PDFs when no explicit file list is given
    pub knowledge_base_directory: PathBuf,
    /// Number of chunks returned per query
    pub top_k: usize,
    pub chunking: ChunkingConfig,
    pub embedding: EmbedConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            knowledge_base_directory: PathBuf::from("data"),
            top_k: 3,
            chunking: ChunkingConfig::default(),
            embedding: EmbedConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Create a configuration scanning `knowledge_base_directory` with defaults elsewhere.
    pub fn new<P: Into<PathBuf>>(knowledge_base_directory: P) -> Self {
        Self {
            knowledge_base_directory: knowledge_base_directory.into(),
            ..Self::default()
        }
    }

    /// Read and validate a TOML configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| RetrieverError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&raw).map_err(|source| RetrieverError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    pub fn with_chunking(mut self, chunking: ChunkingConfig) -> Self {
        self.chunking = chunking;
        self
    }

    pub fn with_embedding(mut self, embedding: EmbedConfig) -> Self {
        self.embedding = embedding;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Use deterministic fallback embeddings of the given dimension.
    pub fn with_deterministic_embeddings(mut self, dimension: usize) -> Self {
        self.embedding = self
            .embedding
            .with_mode(EmbeddingMode::DeterministicFallback)
            .with_dimension(dimension);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(RetrieverError::invalid_config("top_k must be positive"));
        }
        if self.chunking.chunk_size == 0 {
            return Err(RetrieverError::invalid_config("chunk_size must be positive"));
        }
        self.embedding
            .validate()
            .map_err(|e| RetrieverError::invalid_config(e.to_string()))
    }

    /// Overlay settings from the process environment.
    ///
    /// Reads `OPENAI_API_KEY`, `OPENAI_API_BASE`, `RAG_USE_RANDOM_EMBEDDINGS`
    /// and `RAG_FAKE_EMB_DIM`. Unset or empty variables change nothing.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|name| std::env::var(name).ok())
    }

    /// Overlay settings from `lookup`, which maps a variable name to its value.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = get(ENV_API_KEY) {
            self.embedding.api_key = Some(key);
        }
        if let Some(base) = get(ENV_API_BASE) {
            self.embedding.api_base = base;
        }
        if get(ENV_USE_RANDOM_EMBEDDINGS).as_deref() == Some("1") {
            self.embedding.mode = EmbeddingMode::DeterministicFallback;
        }
        if let Some(raw) = get(ENV_FAKE_EMB_DIM) {
            self.embedding.dimension = raw.trim().parse().map_err(|_| {
                RetrieverError::invalid_config(format!(
                    "{ENV_FAKE_EMB_DIM} must be a positive integer, got {raw:?}"
                ))
            })?;
        }
        Ok(())
    }
}
