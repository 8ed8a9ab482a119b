//! Recursive character splitting with overlapping windows.
//!
//! The splitter cuts page text along a separator priority ladder (paragraph
//! breaks, line breaks, spaces, then mid-word) and reassembles the pieces
//! into chunks of at most `chunk_size` characters. Every chunk after the
//! first starts with the trailing `chunk_overlap` characters of its
//! predecessor, so stripping that prefix from each follow-up chunk
//! reconstructs the original text run exactly.

use crate::config::SplitterConfig;
use crate::loader::PageRecord;
use crate::types::IngestError;

/// A bounded slice of document text prepared for embedding.
///
/// Chunk boundaries are mechanical, not semantic. `chunk_index` is the
/// position within the whole document (across pages).
#[derive(Clone, Debug, PartialEq)]
pub struct Chunk {
    /// The chunk text, including any leading overlap carried from the
    /// previous chunk of the same page.
    pub content: String,
    /// Zero-based page the text was extracted from.
    pub page_number: usize,
    /// Path of the source document.
    pub source_path: String,
    /// Zero-based position of this chunk within the document.
    pub chunk_index: usize,
}

/// Splits text into overlapping character windows along natural boundaries.
#[derive(Clone, Debug)]
pub struct RecursiveCharacterSplitter {
    config: SplitterConfig,
}

impl RecursiveCharacterSplitter {
    /// Builds a splitter, rejecting invalid configuration up front.
    pub fn new(config: SplitterConfig) -> Result<Self, IngestError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration this splitter was built with.
    pub fn config(&self) -> &SplitterConfig {
        &self.config
    }

    /// Splits every page and flattens the result into one ordered chunk list.
    ///
    /// Page metadata is copied onto each chunk; pages with no extractable
    /// text contribute nothing.
    pub fn split_pages(&self, pages: &[PageRecord]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for page in pages {
            for content in self.split_text(&page.text) {
                chunks.push(Chunk {
                    chunk_index: chunks.len(),
                    content,
                    page_number: page.page_number,
                    source_path: page.source_path.display().to_string(),
                });
            }
        }
        tracing::debug!(
            pages = pages.len(),
            chunks = chunks.len(),
            "split pages into chunks"
        );
        chunks
    }

    /// Splits a single text run into overlapping chunks.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        // Decompose to pieces that always fit next to an overlap prefix,
        // then pack them greedily. Keeping separators attached to the piece
        // they terminate makes the pieces concatenate back to `text`.
        let budget = self.config.chunk_size - self.config.chunk_overlap;
        let mut pieces = Vec::new();
        self.decompose(text, 0, budget, &mut pieces);
        self.assemble(pieces)
    }

    fn decompose(&self, text: &str, depth: usize, budget: usize, out: &mut Vec<String>) {
        if text.is_empty() {
            return;
        }
        if char_len(text) <= budget {
            out.push(text.to_string());
            return;
        }
        match self.config.separators.get(depth).map(String::as_str) {
            Some(separator) if !separator.is_empty() => {
                for piece in text.split_inclusive(separator) {
                    if char_len(piece) <= budget {
                        out.push(piece.to_string());
                    } else {
                        self.decompose(piece, depth + 1, budget, out);
                    }
                }
            }
            // Empty separator or an exhausted ladder: cut mid-word.
            _ => {
                let mut rest = text;
                while char_len(rest) > budget {
                    let cut = byte_index_at_char(rest, budget);
                    out.push(rest[..cut].to_string());
                    rest = &rest[cut..];
                }
                if !rest.is_empty() {
                    out.push(rest.to_string());
                }
            }
        }
    }

    fn assemble(&self, pieces: Vec<String>) -> Vec<String> {
        let mut chunks: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut current_len = 0usize;

        for piece in pieces {
            let piece_len = char_len(&piece);
            if current_len > 0 && current_len + piece_len > self.config.chunk_size {
                let overlap = tail_chars(&current, self.config.chunk_overlap).to_string();
                current_len = char_len(&overlap);
                chunks.push(std::mem::replace(&mut current, overlap));
            }
            current.push_str(&piece);
            current_len += piece_len;
        }

        if !current.is_empty() {
            chunks.push(current);
        }
        chunks
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Byte offset of the `n`-th character, or the end of the string.
fn byte_index_at_char(text: &str, n: usize) -> usize {
    text.char_indices()
        .nth(n)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len())
}

/// The final `n` characters of `text` (the whole string when shorter).
fn tail_chars(text: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    let total = char_len(text);
    if total <= n {
        return text;
    }
    &text[byte_index_at_char(text, total - n)..]
}
