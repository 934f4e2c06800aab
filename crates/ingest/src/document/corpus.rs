//! Pre-loaded knowledge base read from a JSON file.
//!
//! The file is an array of fragments:
//!
//! ```json
//! [{ "titulo": "The Republic - Book VII", "tipo": "dialogue",
//!    "texto": "...", "dialogo": "Republic", "libro": "Book VII" }]
//! ```
//!
//! Each fragment with text becomes one chunk whose source is the file name.
//! Unknown fields are ignored.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use super::chunker::Chunk;

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("cannot read base corpus {path}: {source}")]
    Io { path: String, source: std::io::Error },
    #[error("base corpus {path} is not a JSON array of fragments: {source}")]
    Parse { path: String, source: serde_json::Error },
    #[error("base corpus {0} contains no fragments with text")]
    Empty(String),
}

/// One fragment of the base corpus.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CorpusEntry {
    #[serde(default)]
    pub titulo: String,
    #[serde(default)]
    pub tipo: String,
    #[serde(default)]
    pub texto: String,
    #[serde(default)]
    pub dialogo: String,
    #[serde(default)]
    pub libro: String,
}

impl CorpusEntry {
    /// "Title (Dialogue, Book)", leaving out whatever is blank.
    pub fn heading(&self) -> String {
        let place: Vec<&str> = [self.dialogo.trim(), self.libro.trim()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect();
        match (self.titulo.trim(), place.is_empty()) {
            ("", true) => String::new(),
            ("", false) => place.join(", "),
            (title, true) => title.to_string(),
            (title, false) => format!("{} ({})", title, place.join(", ")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BaseCorpus {
    source: String,
    entries: Vec<CorpusEntry>,
}

impl BaseCorpus {
    pub fn load(path: &Path) -> Result<Self, CorpusError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CorpusError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let corpus = Self::from_json(&name, &raw)?;
        info!("Loaded {} base corpus fragments from {}", corpus.len(), path.display());
        Ok(corpus)
    }

    /// Parse fragments from JSON text. `source` names the corpus in search
    /// results.
    pub fn from_json(source: &str, raw: &str) -> Result<Self, CorpusError> {
        let parsed: Vec<CorpusEntry> =
            serde_json::from_str(raw).map_err(|e| CorpusError::Parse {
                path: source.to_string(),
                source: e,
            })?;
        let total = parsed.len();
        let entries: Vec<CorpusEntry> = parsed
            .into_iter()
            .filter(|e| !e.texto.trim().is_empty())
            .collect();
        if entries.is_empty() {
            return Err(CorpusError::Empty(source.to_string()));
        }
        if entries.len() < total {
            warn!(
                corpus = source,
                skipped = total - entries.len(),
                "Ignoring base corpus fragments without text"
            );
        }
        Ok(Self {
            source: source.to_string(),
            entries,
        })
    }

    /// Name stored as the source of every corpus chunk.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn entries(&self) -> &[CorpusEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One chunk per fragment. The heading leads the text so retrieved
    /// context says which work it came from.
    pub fn chunks(&self) -> Vec<Chunk> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let heading = entry.heading();
                let content = if heading.is_empty() {
                    entry.texto.trim().to_string()
                } else {
                    format!("{}\n{}", heading, entry.texto.trim())
                };
                Chunk {
                    index,
                    content,
                    source: self.source.clone(),
                    page_number: None,
                    char_offset: 0,
                }
            })
            .collect()
    }
}
