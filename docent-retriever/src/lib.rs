//! docent-retriever: retrieval over a knowledge base of PDF documents
//!
//! This crate turns a directory (or an explicit list) of PDF files into an
//! in-memory vector index and answers top-K similarity queries against it.
//! The index lives for the process; nothing is persisted.
//!
//! ## Key Modules
//!
//! - **[`retrieval`]**: PDF loading, chunking, the vector index and the engine facade
//! - **[`config`]**: TOML configuration with an explicit environment overlay
//! - **[`error`]**: the crate's error type
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docent_retriever::{EngineConfig, RetrievalEngine};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let engine = RetrievalEngine::new(EngineConfig::from_file("docent.toml".as_ref())?)?;
//!
//! // Index every PDF in the knowledge-base directory
//! engine.get_retriever(None).await?;
//!
//! // Passages ready to paste into a chat prompt
//! let context = engine.context_for("What is the refund policy?", 3).await;
//! println!("{context}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! PDFs → Loader → Pages → Chunking → TextChunks → EmbeddingProvider → VectorIndex
//!                                                                        ↓
//!                              chat layer ← RetrievalEngine::retrieve ← Retriever
//! ```

pub mod config;
pub mod error;
pub mod retrieval;

pub use config::EngineConfig;
pub use error::{Result, RetrieverError};
pub use retrieval::chunking_strategy::{ChunkingConfig, ChunkingStrategy, SplitStrategy};
pub use retrieval::engine::{BuildReport, LoadedIndex, RetrievalEngine};
pub use retrieval::index::{IndexStats, Retriever, ScoredChunk, VectorIndex, cosine_similarity};
pub use retrieval::loader::{
    LoadError, LoadErrorKind, LoadReport, discover_pdfs, load_pdfs, should_index_file,
};
