//! Overlapping character-window chunker.
//!
//! Splits extracted documents into chunks of at most `chunk_size` characters
//! where each chunk starts with the last `chunk_overlap` characters of the
//! previous one. Window ends snap back to the nearest paragraph, line,
//! sentence or word boundary in the back half of the window.

mod helpers;
mod splitter;
mod types;

pub use splitter::{chunk_document, split_text};
pub use types::{Chunk, ChunkConfig, ChunkConfigError};
