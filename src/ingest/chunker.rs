//! Deterministic splitting of page text into overlapping chunks.
//!
//! The splitter is a pure function of the input text and the two size
//! parameters. It prefers breaking on paragraph boundaries, then sentence
//! endings, then newlines, then words, and only cuts mid-word when a
//! window contains no usable boundary at all.

use super::loader::PageDocument;

/// A bounded text span derived from one page of a source document. The
/// atomic unit of embedding and retrieval.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub text: String,
    /// Source file path.
    pub source: String,
    pub folder: String,
    pub page_number: usize,
    /// Ordinal position within the page.
    pub chunk_index: usize,
    /// Character offset of the chunk within the page text.
    pub start_offset: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Chunker {
    /// `chunk_overlap` must be smaller than `chunk_size`; the settings
    /// loader enforces this before a chunker is ever constructed.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        debug_assert!(chunk_overlap < chunk_size);
        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    /// Split every document, preserving document order and assigning
    /// per-page ordinal indices.
    pub fn split_documents(&self, documents: &[PageDocument]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for doc in documents {
            for (index, (text, start_offset)) in self.split_text(&doc.text).into_iter().enumerate()
            {
                chunks.push(Chunk {
                    text,
                    source: doc.path.display().to_string(),
                    folder: doc.folder.clone(),
                    page_number: doc.page_number,
                    chunk_index: index,
                    start_offset,
                });
            }
        }
        chunks
    }

    /// Split raw text into `(chunk, start_offset)` pairs. Offsets are in
    /// characters. Consecutive chunks share `chunk_overlap` characters
    /// whenever the window was cut at the size bound.
    pub fn split_text(&self, text: &str) -> Vec<(String, usize)> {
        let chars: Vec<char> = text.chars().collect();
        let total = chars.len();
        if total == 0 {
            return Vec::new();
        }
        if total <= self.chunk_size {
            return vec![(text.to_string(), 0)];
        }

        let mut chunks = Vec::new();
        let mut start = 0;

        while start < total {
            let end = (start + self.chunk_size).min(total);
            let chunk_end = if end < total {
                let window: String = chars[start..end].iter().collect();
                match find_break_point(&window, self.chunk_size) {
                    Some(byte_cut) => start + window[..byte_cut].chars().count(),
                    None => end,
                }
            } else {
                end
            };

            let chunk: String = chars[start..chunk_end].iter().collect();
            chunks.push((chunk, start));

            if chunk_end >= total {
                break;
            }
            // Step back by the overlap unless the chunk was too small for it.
            start = if chunk_end - start > self.chunk_overlap {
                chunk_end - self.chunk_overlap
            } else {
                chunk_end
            };
        }

        chunks
    }
}

/// Find a break point inside a window, returned as a byte offset just past
/// the boundary. Boundaries too close to the window start are rejected so
/// chunks stay reasonably full.
fn find_break_point(window: &str, chunk_size: usize) -> Option<usize> {
    let min_fill = chunk_size / 3;

    if let Some(pos) = window.rfind("\n\n") {
        let cut = pos + 2;
        if window[..cut].chars().count() > min_fill {
            return Some(cut);
        }
    }

    for pattern in [". ", "! ", "? ", ".\n", "!\n", "?\n"] {
        if let Some(pos) = window.rfind(pattern) {
            let cut = pos + pattern.len();
            if window[..cut].chars().count() > min_fill {
                return Some(cut);
            }
        }
    }

    if let Some(pos) = window.rfind('\n') {
        let cut = pos + 1;
        if window[..cut].chars().count() > min_fill {
            return Some(cut);
        }
    }

    if let Some(pos) = window.rfind(' ') {
        let cut = pos + 1;
        if window[..cut].chars().count() > chunk_size / 2 {
            return Some(cut);
        }
    }

    None
}
