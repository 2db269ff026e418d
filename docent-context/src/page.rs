use serde::Serialize;

/// One page of extracted document text.
///
/// Pages are produced by a document loader, one per physical page of the
/// source file. `text` is empty when extraction failed for that page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    /// Path of the file the page was read from.
    pub source_path: String,
    /// 1-based page number within the source file.
    pub page_number: usize,
    /// Extracted page text.
    pub text: String,
}

impl Page {
    pub fn new(source_path: impl Into<String>, page_number: usize, text: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            page_number,
            text: text.into(),
        }
    }

    /// True when the page carries no text at all.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_pages() {
        assert!(Page::new("a.pdf", 1, "").is_blank());
        assert!(Page::new("a.pdf", 2, " \n\t").is_blank());
        assert!(!Page::new("a.pdf", 3, "text").is_blank());
    }
}
