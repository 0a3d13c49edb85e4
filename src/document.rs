//! Page-indexed document text.
//!
//! PDF extraction happens elsewhere; this crate consumes pages as text plus
//! a token count, 1-indexed by position. Plain text files are split into
//! pages on form feeds (or a caller-supplied delimiter).

use crate::error::{OutlineError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Page separator emitted by `pdftotext` and similar tools.
pub const FORM_FEED: &str = "\x0c";

/// Source of page-indexed text.
pub trait PageSource {
    /// Pages in order; page `n` is at position `n - 1`.
    fn pages(&self) -> &[Page];

    /// Concatenated text of pages `start..=end` (1-indexed, clamped).
    fn text_of_pages(&self, start: usize, end: usize) -> String {
        page_slice(self.pages(), start, end)
            .iter()
            .map(|p| p.content.as_str())
            .collect()
    }

    /// Like [`PageSource::text_of_pages`], each page wrapped in
    /// `<physical_index_N>` tags.
    fn text_of_pages_with_labels(&self, start: usize, end: usize) -> String {
        page_slice(self.pages(), start, end)
            .iter()
            .map(Page::with_index_tags)
            .collect()
    }

    /// Physical index of the last page.
    fn end_physical_index(&self) -> usize {
        self.pages().len()
    }
}

fn page_slice(pages: &[Page], start: usize, end: usize) -> &[Page] {
    let start = start.max(1);
    let end = end.min(pages.len());
    if start > end {
        &[]
    } else {
        &pages[start - 1..end]
    }
}

/// A single page in a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    /// 1-indexed page number.
    pub number: usize,
    /// Text content of the page.
    pub content: String,
    /// Approximate token count (words / 0.75).
    pub token_count: usize,
}

impl Page {
    /// Create a new page.
    pub fn new(number: usize, content: String) -> Self {
        let token_count = estimate_tokens(&content);
        Self {
            number,
            content,
            token_count,
        }
    }

    /// Format page content with physical index tags for LLM processing.
    pub fn with_index_tags(&self) -> String {
        format!(
            "<physical_index_{}>\n{}\n<physical_index_{}>\n",
            self.number, self.content, self.number
        )
    }
}

/// A document consisting of one or more pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Document name/title.
    pub name: String,
    /// Original file path (if loaded from file).
    pub path: Option<PathBuf>,
    /// Pages in the document.
    pub pages: Vec<Page>,
}

impl Document {
    /// Create a new document with given name and pages.
    pub fn new(name: impl Into<String>, pages: Vec<Page>) -> Self {
        Self {
            name: name.into(),
            path: None,
            pages,
        }
    }

    /// Load a text file, splitting pages on form feeds.
    pub fn from_text_file(path: &Path) -> Result<Self> {
        Self::from_text_file_with_delimiter(path, FORM_FEED)
    }

    /// Load a text file with custom page delimiter.
    ///
    /// Every part between delimiters is a page, including blank ones, so
    /// page numbers keep matching the source document.
    pub fn from_text_file_with_delimiter(path: &Path, delimiter: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| OutlineError::io(path, e))?;

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("untitled")
            .to_string();

        let mut document = Self::from_text(name, &content, delimiter);
        if document.pages.iter().all(|p| p.content.trim().is_empty()) {
            return Err(OutlineError::DocumentNotFound(path.to_path_buf()));
        }
        document.path = Some(path.to_path_buf());
        Ok(document)
    }

    /// Split raw text into pages on `delimiter`.
    pub fn from_text(name: impl Into<String>, content: &str, delimiter: &str) -> Self {
        let mut parts: Vec<&str> = content.split(delimiter).collect();
        // a trailing delimiter does not start a new page
        if parts.len() > 1 && parts.last().is_some_and(|p| p.trim().is_empty()) {
            parts.pop();
        }

        let pages = parts
            .into_iter()
            .enumerate()
            .map(|(i, s)| Page::new(i + 1, s.to_string()))
            .collect();

        Self::new(name, pages)
    }

    /// Get total number of pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Get total token count across all pages.
    pub fn total_tokens(&self) -> usize {
        self.pages.iter().map(|p| p.token_count).sum()
    }
}

impl PageSource for Document {
    fn pages(&self) -> &[Page] {
        &self.pages
    }
}

/// Estimate token count from text (rough approximation: words / 0.75).
fn estimate_tokens(text: &str) -> usize {
    let word_count = text.split_whitespace().count();
    (word_count as f64 / 0.75) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_page_with_index_tags() {
        let page = Page::new(5, "Test content".to_string());
        let tagged = page.with_index_tags();
        assert!(tagged.starts_with("<physical_index_5>\nTest content"));
        assert!(page.token_count > 0);
    }

    #[test]
    fn test_from_text_splits_pages() {
        let doc = Document::from_text("Test", "one\x0ctwo\x0c\x0cfour\x0c", FORM_FEED);
        assert_eq!(doc.page_count(), 4);
        assert_eq!(doc.pages[2].content, "");
        assert_eq!(doc.pages[3].number, 4);
        assert_eq!(doc.end_physical_index(), 4);
    }

    #[test]
    fn test_text_of_pages() {
        let doc = Document::from_text("Test", "a|b|c", "|");
        assert_eq!(doc.text_of_pages(2, 3), "bc");
        assert_eq!(doc.text_of_pages(0, 10), "abc");
        assert_eq!(doc.text_of_pages(3, 2), "");
        assert_eq!(
            doc.text_of_pages_with_labels(1, 1),
            "<physical_index_1>\na\n<physical_index_1>\n"
        );
    }

    #[test]
    fn test_from_text_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "Cover\x0cContents\x0cChapter 1").unwrap();

        let doc = Document::from_text_file(file.path()).unwrap();
        assert_eq!(doc.page_count(), 3);
        assert!(doc.path.is_some());
    }

    #[test]
    fn test_blank_file_is_rejected() {
        let file = NamedTempFile::new().unwrap();
        let result = Document::from_text_file(file.path());
        assert!(matches!(result, Err(OutlineError::DocumentNotFound(_))));
    }

    #[test]
    fn test_estimate_tokens() {
        let text = "one two three four five six seven eight";
        let tokens = estimate_tokens(text);
        assert!(tokens >= 10 && tokens <= 12);
    }
}
