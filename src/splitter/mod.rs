// Document splitting module
// Loads PDFs page by page and splits page text into overlapping,
// token-budgeted chunks along semantic boundaries.

pub mod pdf;

use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::identity::derive_id;
use crate::tokenizer::Tokenizer;
use crate::{RagError, Result};

/// Separator ladder, most semantic first: paragraph breaks, line breaks,
/// spaces, then individual characters as a last resort.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// A bounded span of document text plus positional metadata and a
/// deterministic id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub content: String,
    pub metadata: ChunkMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Originating file name; the unit of cascading deletion
    pub source: String,
    /// Zero-based page index, -1 if unknown
    #[serde(default = "unknown_page")]
    pub page: i64,
    /// Position within the file's split sequence, from 0
    #[serde(default)]
    pub chunk_index: usize,
}

fn unknown_page() -> i64 {
    -1
}

/// Capability to turn a file path into an ordered chunk sequence.
pub trait DocumentLoader {
    fn load_and_split(
        &self,
        file_path: &Path,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Result<Vec<Chunk>>;
}

/// PDF loader and recursive text splitter driven by a tokenizer's counts.
pub struct PdfSplitter {
    tokenizer: Box<dyn Tokenizer>,
}

impl PdfSplitter {
    #[inline]
    pub fn new(tokenizer: Box<dyn Tokenizer>) -> Self {
        Self { tokenizer }
    }

    /// Split already-extracted pages into chunks, numbering `chunk_index`
    /// across the whole file and tagging each chunk with its page.
    #[inline]
    pub fn chunks_from_pages(
        &self,
        source: &str,
        pages: &[String],
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Result<Vec<Chunk>> {
        validate_budget(chunk_size, chunk_overlap)?;

        let mut chunks = Vec::new();
        let mut chunk_index = 0;

        for (page_index, page_text) in pages.iter().enumerate() {
            for content in self.split_text(page_text, chunk_size, chunk_overlap) {
                let metadata = ChunkMetadata {
                    source: source.to_string(),
                    page: page_index as i64,
                    chunk_index,
                };
                let id = derive_id(&content, &metadata);
                chunks.push(Chunk {
                    id,
                    content,
                    metadata,
                });
                chunk_index += 1;
            }
        }

        debug!(
            "Split '{}' into {} chunks across {} pages",
            source,
            chunks.len(),
            pages.len()
        );

        Ok(chunks)
    }

    /// Split one text span into chunks within the token budget.
    pub(crate) fn split_text(
        &self,
        text: &str,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        self.split_recursive(text, &SEPARATORS, chunk_size, chunk_overlap)
    }

    fn split_recursive(
        &self,
        text: &str,
        separators: &[&str],
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Vec<String> {
        let (separator, remaining) = pick_separator(text, separators);

        let parts: Vec<String> = if separator.is_empty() {
            text.chars().map(String::from).collect()
        } else {
            text.split(separator).map(str::to_string).collect()
        };

        let mut pieces = Vec::new();
        for part in parts {
            if part.trim().is_empty() {
                continue;
            }

            // Keep spans that fit; recurse on the next separator level for
            // those that do not. At the character level nothing is splittable
            // further, so the span is kept as-is.
            if remaining.is_empty() || self.tokenizer.count_tokens(&part) <= chunk_size {
                pieces.push(part);
            } else {
                pieces.extend(self.split_recursive(&part, remaining, chunk_size, chunk_overlap));
            }
        }

        self.merge_pieces(pieces, separator, chunk_size, chunk_overlap)
    }

    /// Greedily pack pieces up to the token budget; when a boundary is
    /// crossed, carry up to `chunk_overlap` tokens-worth of trailing pieces
    /// into the next chunk so adjacent chunks share context.
    fn merge_pieces(
        &self,
        pieces: Vec<String>,
        separator: &str,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<(String, usize)> = VecDeque::new();
        let mut window_tokens = 0usize;

        for piece in pieces {
            let tokens = self.tokenizer.count_tokens(&piece);

            if !window.is_empty() && window_tokens + tokens > chunk_size {
                push_chunk(&mut chunks, &window, separator);

                // Back up: drop leading pieces until the retained tail fits
                // the overlap budget and leaves room for the incoming piece.
                while window_tokens > chunk_overlap
                    || (!window.is_empty() && window_tokens + tokens > chunk_size)
                {
                    match window.pop_front() {
                        Some((_, dropped)) => window_tokens -= dropped,
                        None => break,
                    }
                }
            }

            window_tokens += tokens;
            window.push_back((piece, tokens));
        }

        if !window.is_empty() {
            push_chunk(&mut chunks, &window, separator);
        }

        chunks
    }
}

impl DocumentLoader for PdfSplitter {
    #[inline]
    fn load_and_split(
        &self,
        file_path: &Path,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Result<Vec<Chunk>> {
        // Reject bad budgets before touching the filesystem
        validate_budget(chunk_size, chunk_overlap)?;

        let source = file_path
            .file_name()
            .map_or_else(|| "unknown".to_string(), |n| n.to_string_lossy().into_owned());

        let bytes = fs::read(file_path)?;
        let pages = pdf::extract_pages(&bytes);

        if pages.iter().all(|p| p.trim().is_empty()) {
            info!("No extractable text in '{}'", source);
            return Ok(Vec::new());
        }

        self.chunks_from_pages(&source, &pages, chunk_size, chunk_overlap)
    }
}

fn validate_budget(chunk_size: usize, chunk_overlap: usize) -> Result<()> {
    if chunk_size <= chunk_overlap {
        return Err(RagError::InvalidArgument(format!(
            "chunk_size ({}) must be greater than chunk_overlap ({})",
            chunk_size, chunk_overlap
        )));
    }
    Ok(())
}

fn pick_separator<'a>(text: &str, separators: &'a [&'a str]) -> (&'a str, &'a [&'a str]) {
    for (i, sep) in separators.iter().enumerate() {
        if sep.is_empty() || text.contains(sep) {
            return (sep, separators.get(i + 1..).unwrap_or(&[]));
        }
    }
    ("", &[])
}

fn push_chunk(chunks: &mut Vec<String>, window: &VecDeque<(String, usize)>, separator: &str) {
    let joined = window
        .iter()
        .map(|(piece, _)| piece.as_str())
        .collect::<Vec<_>>()
        .join(separator);
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}
