//! This module splits extracted document text into bounded, overlapping chunks
//! that serve as the atomic retrieval unit of the knowledge base.
//!
//! The module defines two main structs:
//! - [`TextSplitter`]: Responsible for configuring how text is chunked
//!   (maximum chunk length, overlap, delimiters and split mode).
//! - [`TextChunk`]: Represents a single segment of page text, along with the
//!   metadata of the page it came from.
//!
//! # Key Features
//!
//! *   **Boundary-aware splitting**: Text is split at paragraph breaks first,
//!     then line breaks, then spaces. Only when no delimiter is left and a piece
//!     is still too long does the splitter fall back to a hard character cut.
//! *   **Overlap**: After a chunk is emitted, its trailing segments (up to
//!     `chunk_overlap` characters) seed the next chunk, so context that straddles
//!     a boundary is retrievable from both sides.
//! *   **Character semantics**: All lengths and offsets count characters, not
//!     bytes, and cuts never land inside a UTF-8 code point.
//! *   **Strict bound**: A single token longer than the chunk length is cut into
//!     chunk-length pieces, so every chunk satisfies the length bound.
//!
//! # Usage
//!
//! ```
//! use docent_context::{Page, TextSplitter};
//!
//! let splitter = TextSplitter::recursive(40, 10).unwrap();
//! let page = Page::new("handbook.pdf", 1, "First paragraph.\n\nSecond paragraph that runs a little longer.");
//!
//! let chunks = splitter.get_chunks(&page);
//! assert!(chunks.len() > 1);
//! for chunk in &chunks {
//!     assert!(chunk.chunk_text.chars().count() <= 40);
//!     assert_eq!(chunk.source_path, "handbook.pdf");
//!     assert_eq!(chunk.page_number, 1);
//! }
//! ```
use crate::page::Page;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::collections::VecDeque;
use std::ops::Range;

/// Default delimiters, ordered from most to least significant.
///
/// - `\n\n`: Paragraph breaks.
/// - `\n`: Line breaks.
/// - ` `: Word boundaries, the most granular delimiter.
pub const DEFAULT_DELIMITERS: &[&str] = &[
    r"\n\n", // Paragraphs
    r"\n",   // Line breaks
    r" ",    // Spaces
];

/// Errors raised while configuring a [`TextSplitter`].
#[derive(Debug, thiserror::Error)]
pub enum SplitterError {
    #[error("chunk size must be greater than zero")]
    ZeroChunkSize,

    #[error("invalid delimiter pattern {pattern:?}: {source}")]
    InvalidDelimiter {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// How a [`TextSplitter`] cuts text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SplitMode {
    /// Delimiter-aware recursive splitting with greedy merging.
    #[default]
    Recursive,
    /// Fixed-width sliding window with a stride of `chunk_size - chunk_overlap` (at least 1).
    FixedWindow,
}

/// Splits page text into [`TextChunk`]s.
///
/// A splitter holds no per-document state and can be reused across pages and
/// shared between threads.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    delimiters: Vec<Regex>,
    max_chunk_length: usize,
    chunk_overlap: usize,
    mode: SplitMode,
}

/// A single chunk of page text, along with its metadata.
///
/// `chunk_start` is the character offset of `chunk_text` inside the page text,
/// so overlapping chunks can be placed back onto the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Path of the file the page was read from.
    pub source_path: String,
    /// 1-based page number within the source file.
    pub page_number: usize,
    /// The sequence number of this chunk within the page (0-indexed).
    pub sequence: usize,
    /// Character offset of the chunk within the page text.
    pub chunk_start: usize,
    /// The text content of this specific chunk.
    pub chunk_text: String,
}

impl Serialize for TextChunk {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("TextChunk", 6)?;
        state.serialize_field("source_path", &self.source_path)?;
        state.serialize_field("page_number", &self.page_number)?;
        state.serialize_field("sequence", &self.sequence)?;
        state.serialize_field("chunk_start", &self.chunk_start)?;
        state.serialize_field("chunk_text", &self.chunk_text)?;
        state.serialize_field("summary", &self.build())?;
        state.end()
    }
}

impl TextSplitter {
    /// Creates a recursive splitter with custom delimiter patterns.
    ///
    /// # Arguments
    ///
    /// *   `delimiter_patterns` - Regular expressions used to split the text,
    ///     applied in order from most significant (e.g., double newline) to
    ///     least significant (e.g., space).
    /// *   `max_chunk_length` - Maximum chunk length in characters.
    /// *   `chunk_overlap` - Characters of overlap between consecutive chunks.
    ///
    /// # Errors
    ///
    /// Returns [`SplitterError::ZeroChunkSize`] when `max_chunk_length` is zero and
    /// [`SplitterError::InvalidDelimiter`] when a pattern does not compile.
    pub fn new(
        delimiter_patterns: &[&str],
        max_chunk_length: usize,
        chunk_overlap: usize,
    ) -> Result<Self, SplitterError> {
        if max_chunk_length == 0 {
            return Err(SplitterError::ZeroChunkSize);
        }

        let delimiters = delimiter_patterns
            .iter()
            .map(|&pattern| {
                Regex::new(pattern).map_err(|source| SplitterError::InvalidDelimiter {
                    pattern: pattern.to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TextSplitter {
            delimiters,
            max_chunk_length,
            chunk_overlap,
            mode: SplitMode::Recursive,
        })
    }

    /// Creates a recursive splitter using [`DEFAULT_DELIMITERS`].
    pub fn recursive(max_chunk_length: usize, chunk_overlap: usize) -> Result<Self, SplitterError> {
        Self::new(DEFAULT_DELIMITERS, max_chunk_length, chunk_overlap)
    }

    /// Creates a fixed-width sliding-window splitter.
    pub fn fixed_window(
        max_chunk_length: usize,
        chunk_overlap: usize,
    ) -> Result<Self, SplitterError> {
        if max_chunk_length == 0 {
            return Err(SplitterError::ZeroChunkSize);
        }
        Ok(TextSplitter {
            delimiters: Vec::new(),
            max_chunk_length,
            chunk_overlap,
            mode: SplitMode::FixedWindow,
        })
    }

    pub fn max_chunk_length(&self) -> usize {
        self.max_chunk_length
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    pub fn mode(&self) -> SplitMode {
        self.mode
    }

    /// Splits a page into chunks that inherit the page's metadata.
    ///
    /// Chunks are returned in page order. Chunks consisting only of whitespace
    /// are dropped, so a blank page yields no chunks.
    ///
    /// # Examples
    ///
    /// ```
    /// use docent_context::{Page, TextSplitter};
    ///
    /// let splitter = TextSplitter::recursive(500, 0).unwrap();
    /// let page = Page::new("notes.pdf", 3, "This is the first sentence.\n\nThis is a new paragraph.");
    /// let chunks = splitter.get_chunks(&page);
    ///
    /// assert_eq!(chunks.len(), 1);
    /// assert_eq!(chunks[0].page_number, 3);
    /// assert_eq!(chunks[0].chunk_start, 0);
    /// assert_eq!(chunks[0].chunk_text, page.text);
    /// ```
    pub fn get_chunks(&self, page: &Page) -> Vec<TextChunk> {
        let text = page.text.as_str();
        let ranges = match self.mode {
            SplitMode::Recursive => {
                let segments = self.split_recursively_into_segments(text, 0, 0);
                self.merge_segments(text, segments)
            }
            SplitMode::FixedWindow => self.fixed_windows(text),
        };

        ranges
            .into_iter()
            .filter(|range| !text[range.clone()].trim().is_empty())
            .enumerate()
            .map(|(sequence, range)| TextChunk {
                source_path: page.source_path.clone(),
                page_number: page.page_number,
                sequence,
                chunk_start: text[..range.start].chars().count(),
                chunk_text: text[range].to_string(),
            })
            .collect()
    }

    /// Splits every page in order and concatenates the resulting chunks.
    pub fn split_pages(&self, pages: &[Page]) -> Vec<TextChunk> {
        pages.iter().flat_map(|page| self.get_chunks(page)).collect()
    }

    // Recursively splits the text into byte ranges of the original text. Each
    // returned range is at most `max_chunk_length` characters long, delimiter
    // matches are kept as their own ranges, and the ranges are contiguous.
    fn split_recursively_into_segments(
        &self,
        text: &str,
        delimiter_idx: usize,
        current_offset: usize,
    ) -> Vec<Range<usize>> {
        let mut result_segments: Vec<Range<usize>> = Vec::new();

        if text.is_empty() {
            return result_segments;
        }

        if text.chars().count() <= self.max_chunk_length {
            result_segments.push(current_offset..(current_offset + text.len()));
            return result_segments;
        }

        let Some(current_delimiter) = self.delimiters.get(delimiter_idx) else {
            return hard_cut(text, self.max_chunk_length, current_offset);
        };

        let mut local_byte_start = 0;
        for mat in current_delimiter.find_iter(text) {
            if mat.start() > local_byte_start {
                let sub_text = &text[local_byte_start..mat.start()];
                result_segments.extend(self.split_recursively_into_segments(
                    sub_text,
                    delimiter_idx + 1,
                    current_offset + local_byte_start,
                ));
                local_byte_start = mat.start();
            }
            if mat.is_empty() {
                continue;
            }
            result_segments.extend(hard_cut(
                mat.as_str(),
                self.max_chunk_length,
                current_offset + mat.start(),
            ));
            local_byte_start = mat.end();
        }

        if local_byte_start < text.len() {
            let sub_text = &text[local_byte_start..];
            result_segments.extend(self.split_recursively_into_segments(
                sub_text,
                delimiter_idx + 1,
                current_offset + local_byte_start,
            ));
        }

        result_segments
    }

    // Greedily packs contiguous segments into chunks of at most `max_chunk_length`
    // characters. When a chunk is emitted, segments are dropped from its front
    // until at most `chunk_overlap` characters remain and the next segment fits.
    fn merge_segments(&self, text: &str, segments: Vec<Range<usize>>) -> Vec<Range<usize>> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<(Range<usize>, usize)> = VecDeque::new();
        let mut window_len = 0;

        for segment in segments {
            let segment_len = text[segment.clone()].chars().count();

            if window_len + segment_len > self.max_chunk_length {
                if let (Some((first, _)), Some((last, _))) = (window.front(), window.back()) {
                    chunks.push(first.start..last.end);
                }
                while !window.is_empty()
                    && (window_len > self.chunk_overlap
                        || window_len + segment_len > self.max_chunk_length)
                {
                    if let Some((_, len)) = window.pop_front() {
                        window_len -= len;
                    }
                }
            }

            window.push_back((segment, segment_len));
            window_len += segment_len;
        }

        if let (Some((first, _)), Some((last, _))) = (window.front(), window.back()) {
            chunks.push(first.start..last.end);
        }

        chunks
    }

    fn fixed_windows(&self, text: &str) -> Vec<Range<usize>> {
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(idx, _)| idx)
            .chain(std::iter::once(text.len()))
            .collect();
        let total_chars = boundaries.len() - 1;
        let stride = self
            .max_chunk_length
            .saturating_sub(self.chunk_overlap)
            .max(1);

        let mut windows = Vec::new();
        let mut start = 0;
        while start < total_chars {
            let end = (start + self.max_chunk_length).min(total_chars);
            windows.push(boundaries[start]..boundaries[end]);
            if end == total_chars {
                break;
            }
            start += stride;
        }
        windows
    }
}

// Cuts `text` into pieces of at most `max_chars` characters, returned as byte
// ranges shifted by `offset`.
fn hard_cut(text: &str, max_chars: usize, offset: usize) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut piece_start = 0;
    let mut piece_chars = 0;

    for (idx, _) in text.char_indices() {
        if piece_chars == max_chars {
            ranges.push(offset + piece_start..offset + idx);
            piece_start = idx;
            piece_chars = 0;
        }
        piece_chars += 1;
    }
    if piece_start < text.len() {
        ranges.push(offset + piece_start..offset + text.len());
    }

    ranges
}

impl TextChunk {
    /// Builds the passage used when injecting this chunk into a chat prompt.
    ///
    /// # Examples
    ///
    /// ```
    /// use docent_context::{Page, TextSplitter};
    ///
    /// let splitter = TextSplitter::recursive(500, 0).unwrap();
    /// let chunks = splitter.get_chunks(&Page::new("kb/guide.pdf", 2, "Refunds take five days."));
    ///
    /// assert_eq!(
    ///     chunks[0].build(),
    ///     "Source: kb/guide.pdf (page 2)\nContent: Refunds take five days."
    /// );
    /// ```
    pub fn build(&self) -> String {
        format!(
            "Source: {} (page {})\nContent: {}",
            self.source_path, self.page_number, self.chunk_text
        )
    }

    /// Length of the chunk in characters.
    pub fn char_len(&self) -> usize {
        self.chunk_text.chars().count()
    }

    /// Character offset just past the end of the chunk within its page.
    pub fn chunk_end(&self) -> usize {
        self.chunk_start + self.char_len()
    }
}

/// Joins chunk passages into the context block handed to the chat layer.
///
/// Returns an empty string when there are no chunks.
pub fn build_context_block<'a>(chunks: impl IntoIterator<Item = &'a TextChunk>) -> String {
    chunks
        .into_iter()
        .map(TextChunk::build)
        .collect::<Vec<_>>()
        .join("\n\n")
}
