pub mod page;
pub mod text;

// Re-export the splitter and chunk types for external use
pub use page::Page;
pub use text::{
    DEFAULT_DELIMITERS, SplitMode, SplitterError, TextChunk, TextSplitter, build_context_block,
};
