use crate::error::{Result, RetrieverError};
use docent_context::{Page, TextChunk, TextSplitter};
use serde::{Deserialize, Serialize};

/// How page text is cut into chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SplitStrategy {
    /// Split on paragraph, line, then word boundaries
    #[default]
    Recursive,
    /// Fixed-size character windows with a constant stride
    FixedWindow,
}

/// Configuration for chunking pages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum size of each chunk in characters
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks of a page
    pub chunk_overlap: usize,
    pub strategy: SplitStrategy,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            strategy: SplitStrategy::Recursive,
        }
    }
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            ..Self::default()
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_chunk_overlap(mut self, chunk_overlap: usize) -> Self {
        self.chunk_overlap = chunk_overlap;
        self
    }

    pub fn with_strategy(mut self, strategy: SplitStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

/// Strategy for chunking pages - delegates the splitting to docent-context
#[derive(Debug, Clone)]
pub struct ChunkingStrategy {
    config: ChunkingConfig,
    splitter: TextSplitter,
}

impl ChunkingStrategy {
    /// Create a new chunking strategy with the given configuration
    ///
    /// Fails when `chunk_size` is zero. An overlap at or above the chunk size
    /// is accepted; the splitter then advances one character at a time.
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        let splitter = match config.strategy {
            SplitStrategy::Recursive => {
                TextSplitter::recursive(config.chunk_size, config.chunk_overlap)
            }
            SplitStrategy::FixedWindow => {
                TextSplitter::fixed_window(config.chunk_size, config.chunk_overlap)
            }
        }
        .map_err(|e| RetrieverError::invalid_config(e.to_string()))?;

        Ok(Self { config, splitter })
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Chunk pages in order. Each chunk carries its page's source and number.
    pub fn chunk_pages(&self, pages: &[Page]) -> Vec<TextChunk> {
        let chunks = self.splitter.split_pages(pages);

        tracing::debug!(
            "Chunked {} pages into {} chunks (size: {}, overlap: {})",
            pages.len(),
            chunks.len(),
            self.config.chunk_size,
            self.config.chunk_overlap
        );

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunking_strategy() {
        let strategy = ChunkingStrategy::new(ChunkingConfig::new(40, 10)).unwrap();

        let pages = vec![
            Page::new("kb/manual.pdf", 1, "The device ships with a charger.\n\nCharge it for two hours before first use."),
            Page::new("kb/manual.pdf", 2, ""),
            Page::new("kb/manual.pdf", 3, "Warranty lasts one year."),
        ];
        let chunks = strategy.chunk_pages(&pages);

        assert!(chunks.len() >= 3);
        assert!(chunks.iter().all(|c| c.char_len() <= 40));
        assert!(chunks.iter().all(|c| c.source_path == "kb/manual.pdf"));
        // The blank page contributes nothing and order follows the pages
        assert!(chunks.iter().all(|c| c.page_number != 2));
        assert_eq!(chunks.last().unwrap().page_number, 3);
        assert_eq!(chunks.last().unwrap().chunk_text, "Warranty lasts one year.");
        assert_eq!(chunks[0].page_number, 1);
        assert_eq!(chunks[0].chunk_start, 0);
    }

    #[test]
    fn test_fixed_window_strategy() {
        let config = ChunkingConfig::new(10, 5).with_strategy(SplitStrategy::FixedWindow);
        let strategy = ChunkingStrategy::new(config).unwrap();

        let chunks = strategy.chunk_pages(&[Page::new("a.pdf", 1, "abcdefghijklmnopqrst")]);
        let starts: Vec<usize> = chunks.iter().map(|c| c.chunk_start).collect();
        assert_eq!(starts, vec![0, 5, 10]);
        assert_eq!(chunks[2].chunk_text, "klmnopqrst");
    }

    #[test]
    fn test_invalid_config() {
        let err = ChunkingStrategy::new(ChunkingConfig::new(0, 0)).unwrap_err();
        assert!(matches!(err, RetrieverError::InvalidConfig { .. }));
    }
}
