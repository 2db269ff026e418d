//! Error types for building and querying retrievers

use docent_embed::EmbedError;
use std::path::PathBuf;

/// Result type for retriever operations.
pub type Result<T> = std::result::Result<T, RetrieverError>;

/// Errors that stop an index build, a query, or engine setup.
///
/// Per-file loading problems are not represented here. They are collected as
/// [`LoadError`](crate::retrieval::loader::LoadError)s in a load report and
/// never abort a build on their own.
#[derive(Debug, thiserror::Error)]
pub enum RetrieverError {
    /// The embedding provider could not produce vectors
    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbedError),

    /// The provider's output does not line up with the chunks it was given
    #[error("Index build failed: {message}")]
    IndexBuild { message: String },

    /// A query vector does not have the index's dimension
    #[error("Query dimension {actual} does not match index dimension {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Failed to read config file {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// The knowledge-base directory exists but could not be listed
    #[error("Failed to scan {}: {source}", path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RetrieverError {
    pub fn index_build<S: Into<String>>(message: S) -> Self {
        Self::IndexBuild {
            message: message.into(),
        }
    }

    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}
