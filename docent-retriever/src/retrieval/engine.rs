//! # Retrieval Engine
//!
//! The facade the chat layer talks to. It turns a set of PDF files into a
//! ready-to-query [`Retriever`] and answers `retrieve(query, k)` calls.
//!
//! ## Pipeline
//!
//! ```text
//! paths (or scan of knowledge_base_directory)
//!   → loader (Pages, per-file failures collected)
//!   → chunking strategy (TextChunks)
//!   → Retriever::build (one embedding call, in-memory index)
//! ```
//!
//! Each stage that yields nothing ends the pipeline with `Ok(None)` and a
//! warning. An empty knowledge base is an expected state, not an error.
//!
//! ## Caching
//!
//! Built retrievers are cached per engine, keyed by the sorted, de-duplicated
//! file list and the embedding mode. A repeated request for the same key
//! reuses the cached index without loading or embedding anything. Concurrent
//! requests for one key share a single in-flight build.
//!
//! ## Active retriever
//!
//! Every successful [`RetrievalEngine::get_retriever`] call makes its result
//! the engine's active retriever, which [`RetrievalEngine::retrieve`] queries.
//! A failed build leaves the previous active retriever in place.
//!
//! ## Usage
//!
//! ```no_run
//! use docent_retriever::{EngineConfig, RetrievalEngine};
//!
//! # async fn example() -> docent_retriever::Result<()> {
//! let config = EngineConfig::new("data").with_deterministic_embeddings(384);
//! let engine = RetrievalEngine::new(config)?;
//!
//! if engine.get_retriever(None).await?.is_some() {
//!     for hit in engine.retrieve("How long do refunds take?", 3).await {
//!         println!("{:.3} {}", hit.similarity, hit.chunk.build());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use docent_context::build_context_block;
use docent_embed::{EmbeddingMode, EmbeddingProvider, create_provider};
use serde::Serialize;
use tokio::sync::{Mutex, OnceCell, RwLock};
use tracing::{debug, info, warn};

use super::chunking_strategy::ChunkingStrategy;
use super::index::{Retriever, ScoredChunk};
use super::loader::{LoadError, discover_pdfs, load_pdfs};
use crate::config::EngineConfig;
use crate::error::{Result, RetrieverError};

/// Cache key: the effective file set and the embedding mode.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    paths: Vec<PathBuf>,
    mode: EmbeddingMode,
}

impl CacheKey {
    fn new(paths: &[PathBuf], mode: EmbeddingMode) -> Self {
        let mut paths = paths.to_vec();
        paths.sort();
        paths.dedup();
        Self { paths, mode }
    }
}

/// What happened while building one index.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    /// Files the build was asked to load, after de-duplication
    pub files_requested: usize,
    pub files_loaded: usize,
    pub pages: usize,
    pub chunks: usize,
    /// Files skipped because they could not be read or parsed
    pub failures: Vec<LoadError>,
}

/// A cached retriever together with the report of the build that produced it.
#[derive(Debug, Clone)]
pub struct LoadedIndex {
    pub retriever: Retriever,
    pub report: Arc<BuildReport>,
}

// A build that produced nothing is not cached, so a later call can pick up
// files that have appeared since.
enum BuildFailure {
    Empty,
    Failed(RetrieverError),
}

/// Builds, caches and queries retrievers over PDF knowledge bases.
pub struct RetrievalEngine {
    config: EngineConfig,
    chunking: ChunkingStrategy,
    provider: Arc<dyn EmbeddingProvider>,
    cache: Mutex<HashMap<CacheKey, Arc<OnceCell<LoadedIndex>>>>,
    active: RwLock<Option<Retriever>>,
}

impl std::fmt::Debug for RetrievalEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalEngine")
            .field("config", &self.config)
            .field("provider", &self.provider.provider_name())
            .finish()
    }
}

impl RetrievalEngine {
    /// Create an engine, building the embedding provider from `config.embedding`.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let provider = create_provider(&config.embedding)?;
        Self::with_provider(config, provider)
    }

    /// Create an engine that embeds with `provider` instead of the configured one.
    pub fn with_provider(
        config: EngineConfig,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        if config.top_k == 0 {
            return Err(RetrieverError::invalid_config("top_k must be positive"));
        }
        let chunking = ChunkingStrategy::new(config.chunking.clone())?;

        info!(
            "Retrieval engine ready: knowledge base {}, {} embeddings",
            config.knowledge_base_directory.display(),
            provider.mode()
        );

        Ok(Self {
            config,
            chunking,
            provider,
            cache: Mutex::new(HashMap::new()),
            active: RwLock::new(None),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn mode(&self) -> EmbeddingMode {
        self.provider.mode()
    }

    /// Get a retriever over `paths`, or over the knowledge-base directory when
    /// `paths` is `None`.
    ///
    /// Returns `Ok(None)` when there is nothing to index: no PDFs found, none
    /// loadable, or no text in any of them. Errors come from the embedding
    /// provider or from an inconsistent index build.
    pub async fn get_retriever(&self, paths: Option<&[PathBuf]>) -> Result<Option<Retriever>> {
        Ok(self.load_index(paths).await?.map(|loaded| loaded.retriever))
    }

    /// Like [`get_retriever`](Self::get_retriever), also returning the build report.
    pub async fn load_index(&self, paths: Option<&[PathBuf]>) -> Result<Option<LoadedIndex>> {
        let paths = match paths {
            Some(paths) => {
                if paths.is_empty() {
                    warn!("No PDF files to index: the requested file list is empty");
                    return Ok(None);
                }
                paths.to_vec()
            }
            None => {
                let dir = &self.config.knowledge_base_directory;
                let found = discover_pdfs(dir).await?;
                debug!("Found {} PDFs in {}", found.len(), dir.display());
                if found.is_empty() {
                    warn!("No PDF files to index in {}", dir.display());
                    return Ok(None);
                }
                found
            }
        };

        let key = CacheKey::new(&paths, self.provider.mode());
        let cell = {
            let mut cache = self.cache.lock().await;
            cache.entry(key.clone()).or_default().clone()
        };

        if cell.initialized() {
            debug!("Reusing cached index for {} files", key.paths.len());
        }

        let outcome = cell
            .get_or_try_init(|| self.build_index(&key.paths))
            .await
            .cloned();

        match outcome {
            Ok(loaded) => {
                *self.active.write().await = Some(loaded.retriever.clone());
                Ok(Some(loaded))
            }
            Err(BuildFailure::Empty) => {
                self.forget_unbuilt(&key, &cell).await;
                Ok(None)
            }
            Err(BuildFailure::Failed(err)) => {
                self.forget_unbuilt(&key, &cell).await;
                warn!("Index build failed, keeping the previous index: {}", err);
                Err(err)
            }
        }
    }

    // Drops the cache slot of a build that produced nothing, unless another
    // caller has since replaced or filled it.
    async fn forget_unbuilt(&self, key: &CacheKey, cell: &Arc<OnceCell<LoadedIndex>>) {
        let mut cache = self.cache.lock().await;
        if let Some(current) = cache.get(key) {
            if Arc::ptr_eq(current, cell) && !current.initialized() {
                cache.remove(key);
            }
        }
    }

    async fn build_index(&self, paths: &[PathBuf]) -> std::result::Result<LoadedIndex, BuildFailure> {
        info!("Building index over {} files", paths.len());

        let load = load_pdfs(paths).await;
        if !load.failures.is_empty() {
            let failed: Vec<String> = load
                .failures
                .iter()
                .map(|f| f.path.display().to_string())
                .collect();
            warn!("Failed to load {} files: {}", failed.len(), failed.join(", "));
        }
        if load.pages.is_empty() {
            warn!("No pages could be loaded; the knowledge base is empty");
            return Err(BuildFailure::Empty);
        }

        let chunks = self.chunking.chunk_pages(&load.pages);
        if chunks.is_empty() {
            warn!("Loaded PDFs contain no extractable text; the knowledge base is empty");
            return Err(BuildFailure::Empty);
        }

        let report = BuildReport {
            files_requested: paths.len(),
            files_loaded: load.files_loaded(),
            pages: load.pages.len(),
            chunks: chunks.len(),
            failures: load.failures,
        };

        let retriever = Retriever::build(chunks, self.provider.clone())
            .await
            .map_err(BuildFailure::Failed)?;

        Ok(LoadedIndex {
            retriever,
            report: Arc::new(report),
        })
    }

    /// The retriever most recently returned by a successful build or cache hit.
    pub async fn active_retriever(&self) -> Option<Retriever> {
        self.active.read().await.clone()
    }

    /// Top-`k` chunks for `query` from the active retriever.
    ///
    /// When no retriever is active yet, the knowledge-base directory is
    /// indexed first. Any failure is logged and yields an empty list so the
    /// caller can answer without retrieved context.
    pub async fn retrieve(&self, query: &str, k: usize) -> Vec<ScoredChunk> {
        let retriever = match self.active_retriever().await {
            Some(retriever) => Some(retriever),
            None => match self.get_retriever(None).await {
                Ok(retriever) => retriever,
                Err(err) => {
                    warn!("Retrieval unavailable: {}", err);
                    None
                }
            },
        };

        match retriever {
            Some(retriever) => query_gracefully(&retriever, query, k).await,
            None => Vec::new(),
        }
    }

    /// Build or reuse the retriever for `paths`, then query it.
    ///
    /// If the build fails the previously active retriever answers instead.
    /// Never fails: errors are logged and produce an empty list.
    pub async fn retrieve_from(
        &self,
        paths: Option<&[PathBuf]>,
        query: &str,
        k: usize,
    ) -> Vec<ScoredChunk> {
        let retriever = match self.get_retriever(paths).await {
            Ok(retriever) => retriever,
            Err(err) => {
                warn!("Retrieval build failed: {}", err);
                self.active_retriever().await
            }
        };

        match retriever {
            Some(retriever) => query_gracefully(&retriever, query, k).await,
            None => Vec::new(),
        }
    }

    /// Prompt context for `query`: the retrieved passages joined for the chat
    /// layer, or an empty string when nothing was retrieved.
    pub async fn context_for(&self, query: &str, k: usize) -> String {
        let results = self.retrieve(query, k).await;
        build_context_block(results.iter().map(|r| &r.chunk))
    }

    /// Number of indexes currently cached.
    pub async fn cached_index_count(&self) -> usize {
        self.cache
            .lock()
            .await
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }

    /// Number of cache slots, including builds still in flight.
    pub async fn cache_slot_count(&self) -> usize {
        self.cache.lock().await.len()
    }

    /// Drop every cached index. The active retriever stays usable.
    pub async fn clear_cache(&self) {
        let mut cache = self.cache.lock().await;
        info!("Clearing {} cached indexes", cache.len());
        cache.clear();
    }
}

async fn query_gracefully(retriever: &Retriever, query: &str, k: usize) -> Vec<ScoredChunk> {
    match retriever.retrieve(query, k).await {
        Ok(results) => {
            debug!("Retrieved {} chunks", results.len());
            results
        }
        Err(err) => {
            warn!("Retrieval failed, continuing without context: {}", err);
            Vec::new()
        }
    }
}
