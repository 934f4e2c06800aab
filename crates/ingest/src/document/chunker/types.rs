//! Chunk configuration and output types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkConfigError {
    #[error("chunk size must be greater than zero")]
    ZeroSize,
    #[error("chunk overlap ({overlap}) must be smaller than chunk size ({size})")]
    OverlapTooLarge { size: usize, overlap: usize },
}

/// Configuration for the chunking engine. Sizes are in characters.
///
/// Construct through [`ChunkConfig::new`], which guarantees
/// `chunk_overlap < chunk_size` so the window always moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl ChunkConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, ChunkConfigError> {
        if chunk_size == 0 {
            return Err(ChunkConfigError::ZeroSize);
        }
        if chunk_overlap >= chunk_size {
            return Err(ChunkConfigError::OverlapTooLarge {
                size: chunk_size,
                overlap: chunk_overlap,
            });
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

// ── Chunk output ────────────────────────────────────────────────────────────

/// A chunk of text with metadata for attribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// 0-based index within the document.
    pub index: usize,
    /// The chunk text content.
    pub content: String,
    /// Filename of the document the chunk was cut from.
    pub source: String,
    /// Page on which the chunk starts.
    pub page_number: Option<usize>,
    /// Character offset in the document's full text.
    pub char_offset: usize,
}
