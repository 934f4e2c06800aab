//! Window splitter and document entry point.

use super::helpers::{find_break, page_for_offset};
use super::types::{Chunk, ChunkConfig};
use crate::document::{ExtractedDocument, PAGE_SEPARATOR};

/// Split `text` into overlapping windows, returning `(char_offset, content)`.
///
/// Every window holds at most `chunk_size` characters and, apart from the
/// first, begins with exactly the last `chunk_overlap` characters of the
/// window before it. Text that fits in one window yields one chunk; empty
/// text yields none.
pub fn split_text(text: &str, config: &ChunkConfig) -> Vec<(usize, String)> {
    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();
    let size = config.chunk_size();
    let overlap = config.chunk_overlap();

    let mut pieces = Vec::new();
    if total == 0 {
        return pieces;
    }

    let mut start = 0usize;
    loop {
        let max_end = (start + size).min(total);
        if max_end == total {
            pieces.push((start, chars[start..total].iter().collect()));
            break;
        }

        // Only look for boundaries in the back half of the window, and never
        // so early that the next window would fail to advance.
        let min_end = (start + overlap + 1).max(start + size / 2).min(max_end);
        let end = find_break(&chars, min_end, max_end);

        pieces.push((start, chars[start..end].iter().collect()));
        start = end - overlap;
    }
    pieces
}

/// Chunk a document, tagging each chunk with its source file and the page on
/// which it starts.
pub fn chunk_document(doc: &ExtractedDocument, config: &ChunkConfig) -> Vec<Chunk> {
    let separator_len = PAGE_SEPARATOR.chars().count();
    let mut page_starts = Vec::with_capacity(doc.pages.len());
    let mut offset = 0usize;
    for page in &doc.pages {
        page_starts.push((offset, page.page_number));
        offset += page.text.chars().count() + separator_len;
    }

    split_text(&doc.full_text(), config)
        .into_iter()
        .enumerate()
        .map(|(index, (char_offset, content))| Chunk {
            index,
            content,
            source: doc.filename.clone(),
            page_number: page_for_offset(&page_starts, char_offset),
            char_offset,
        })
        .collect()
}
