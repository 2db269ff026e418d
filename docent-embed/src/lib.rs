//! # docent-embed
//!
//! Text embeddings for the docent retrieval engine. Two interchangeable
//! providers sit behind the async [`EmbeddingProvider`] trait:
//!
//! - **Live**: [`OpenAiProvider`] calls an OpenAI-compatible `/embeddings`
//!   endpoint in batches of at most 64 texts, with a request timeout.
//! - **Deterministic fallback**: [`DeterministicProvider`] derives a
//!   pseudo-random vector from a hash of each text. No network, same output
//!   on every run. Meant for development and tests.
//!
//! The mode is chosen by configuration through [`create_provider`]; nothing
//! in the crate reads the environment or falls back silently.
//!
//! ## Quick Start
//!
//! ```
//! use docent_embed::{EmbedConfig, create_provider};
//!
//! # async fn example() -> docent_embed::Result<()> {
//! let provider = create_provider(&EmbedConfig::deterministic(384))?;
//!
//! let texts = vec!["Hello world".to_string(), "How are you?".to_string()];
//! let result = provider.embed_texts(&texts).await?;
//!
//! println!("Generated {} embeddings of dimension {}", result.len(), result.dimension);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`config`]: [`EmbedConfig`] and [`EmbeddingMode`]
//! - [`provider`]: the provider trait, [`EmbeddingResult`] and [`create_provider`]
//! - [`openai`]: the live HTTP provider
//! - [`deterministic`]: the hash-seeded fallback
//! - [`error`]: error types and result handling
//!
//! ## Error Handling
//!
//! All operations return [`Result<T>`] using the crate's [`EmbedError`] type.
//! Any error means embeddings are unavailable for the current build or query.

pub mod config;
pub mod deterministic;
pub mod error;
pub mod openai;
pub mod provider;

// Re-export main types for easy access
pub use config::{EmbedConfig, EmbeddingMode};
pub use deterministic::DeterministicProvider;
pub use error::{EmbedError, Result};
pub use openai::OpenAiProvider;
pub use provider::{EmbeddingProvider, EmbeddingResult, create_provider};
