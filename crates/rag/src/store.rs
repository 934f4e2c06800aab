//! In-process vector store with cosine similarity search.
//!
//! One store holds one collection. A collection is persisted as a single JSON
//! file under `<dir>/<collection>/store.json`, rewritten atomically after
//! every change.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use pdfchat_ingest::document::chunker::Chunk;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info};

const STORE_FILE: &str = "store.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("got {vectors} vectors for {chunks} chunks")]
    LengthMismatch { chunks: usize, vectors: usize },
    #[error("vector dimension mismatch: store holds {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("vector for '{file}' chunk {index} contains NaN or infinite values")]
    InvalidVector { file: String, index: usize },
    #[error("store IO error: {0}")]
    Io(#[from] io::Error),
    #[error("store file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

// ── Types ──────────────────────────────────────────

/// One indexed chunk with its vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry {
    /// SHA-256 of (source, content), hex encoded.
    pub id: String,
    pub source: String,
    pub chunk_index: usize,
    pub page_number: Option<usize>,
    pub content: String,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub source: String,
    pub chunk_index: usize,
    pub page_number: Option<usize>,
    pub content: String,
    pub similarity: f32,
}

#[derive(Serialize, Deserialize)]
struct PersistedCollection {
    collection: String,
    dimensions: Option<usize>,
    entries: Vec<StoredEntry>,
}

pub struct VectorStore {
    collection: String,
    path: Option<PathBuf>,
    dimensions: Option<usize>,
    entries: Vec<StoredEntry>,
    ids: HashSet<String>,
}

/// Stable entry id: identical text from the same file always maps to the same id.
pub fn entry_id(source: &str, content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update([0u8]);
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Cosine similarity; 0.0 when either vector has zero length.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

// ── Operations ─────────────────────────────────────

impl VectorStore {
    /// A store that is never written to disk.
    pub fn in_memory(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            path: None,
            dimensions: None,
            entries: Vec::new(),
            ids: HashSet::new(),
        }
    }

    /// Open a persisted collection, starting empty if it does not exist yet.
    pub fn open(dir: &Path, collection: &str) -> Result<Self, StoreError> {
        let path = dir.join(collection).join(STORE_FILE);
        let mut store = Self::in_memory(collection);
        store.path = Some(path.clone());

        match fs::read_to_string(&path) {
            Ok(raw) => {
                let persisted: PersistedCollection = serde_json::from_str(&raw)?;
                store.dimensions = persisted.dimensions;
                store.ids = persisted.entries.iter().map(|e| e.id.clone()).collect();
                store.entries = persisted.entries;
                info!(
                    collection,
                    entries = store.entries.len(),
                    "Loaded vector store from {}",
                    path.display()
                );
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(collection, "No persisted store at {}", path.display());
            }
            Err(e) => return Err(e.into()),
        }
        Ok(store)
    }

    /// Add chunks with their vectors. Entries already present (same source and
    /// text) are skipped. Returns the number of entries added.
    ///
    /// All vectors are validated before anything is inserted.
    pub fn upsert(&mut self, chunks: &[Chunk], vectors: Vec<Vec<f32>>) -> Result<usize, StoreError> {
        if chunks.len() != vectors.len() {
            return Err(StoreError::LengthMismatch {
                chunks: chunks.len(),
                vectors: vectors.len(),
            });
        }

        let mut dims = self.dimensions;
        for (chunk, vector) in chunks.iter().zip(&vectors) {
            if vector.iter().any(|v| !v.is_finite()) {
                return Err(StoreError::InvalidVector {
                    file: chunk.source.clone(),
                    index: chunk.index,
                });
            }
            match dims {
                Some(expected) if expected != vector.len() => {
                    return Err(StoreError::DimensionMismatch {
                        expected,
                        actual: vector.len(),
                    });
                }
                Some(_) => {}
                None => dims = Some(vector.len()),
            }
        }
        self.dimensions = dims;

        let mut added = 0;
        for (chunk, embedding) in chunks.iter().zip(vectors) {
            let id = entry_id(&chunk.source, &chunk.content);
            if !self.ids.insert(id.clone()) {
                continue;
            }
            self.entries.push(StoredEntry {
                id,
                source: chunk.source.clone(),
                chunk_index: chunk.index,
                page_number: chunk.page_number,
                content: chunk.content.clone(),
                embedding,
            });
            added += 1;
        }

        debug!(collection = %self.collection, added, skipped = chunks.len() - added, "Upserted chunks");
        Ok(added)
    }

    /// Replace the collection with `chunks`, keeping existing entries whose
    /// source is `keep_source`. The new contents are validated and persisted
    /// before `self` changes, so on error the previous contents stay in place.
    /// Returns the number of entries added.
    pub fn replace(
        &mut self,
        chunks: &[Chunk],
        vectors: Vec<Vec<f32>>,
        keep_source: Option<&str>,
    ) -> Result<usize, StoreError> {
        let staged = self.staged(|e| keep_source == Some(e.source.as_str()));
        let removed = self.entries.len() - staged.entries.len();
        let added = self.commit(staged, chunks, vectors)?;
        info!(collection = %self.collection, removed, added, "Replaced vector store contents");
        Ok(added)
    }

    /// Add chunks and persist, all or nothing.
    pub fn append(&mut self, chunks: &[Chunk], vectors: Vec<Vec<f32>>) -> Result<usize, StoreError> {
        let staged = self.staged(|_| true);
        self.commit(staged, chunks, vectors)
    }

    fn staged(&self, keep: impl Fn(&StoredEntry) -> bool) -> Self {
        let mut staged = Self::in_memory(self.collection.clone());
        staged.path = self.path.clone();
        staged.entries = self.entries.iter().filter(|e| keep(e)).cloned().collect();
        staged.ids = staged.entries.iter().map(|e| e.id.clone()).collect();
        staged.dimensions = staged.entries.first().map(|e| e.embedding.len());
        staged
    }

    fn commit(
        &mut self,
        mut staged: Self,
        chunks: &[Chunk],
        vectors: Vec<Vec<f32>>,
    ) -> Result<usize, StoreError> {
        let added = staged.upsert(chunks, vectors)?;
        staged.persist()?;
        *self = staged;
        Ok(added)
    }

    /// The `k` entries most similar to `vector`, best first. Ties are broken
    /// by source name, then chunk index. An empty store yields no results.
    pub fn query(&self, vector: &[f32], k: usize) -> Result<Vec<SearchResult>, StoreError> {
        if self.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if let Some(expected) = self.dimensions {
            if expected != vector.len() {
                return Err(StoreError::DimensionMismatch {
                    expected,
                    actual: vector.len(),
                });
            }
        }

        let mut scored: Vec<(f32, &StoredEntry)> = self
            .entries
            .iter()
            .map(|e| (cosine_similarity(vector, &e.embedding), e))
            .collect();

        scored.sort_by(|(sa, a), (sb, b)| {
            sb.total_cmp(sa)
                .then_with(|| a.source.cmp(&b.source))
                .then_with(|| a.chunk_index.cmp(&b.chunk_index))
        });

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(similarity, e)| SearchResult {
                source: e.source.clone(),
                chunk_index: e.chunk_index,
                page_number: e.page_number,
                content: e.content.clone(),
                similarity,
            })
            .collect())
    }

    /// Remove every entry and the persisted file.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        let removed = self.entries.len();
        self.entries.clear();
        self.ids.clear();
        self.dimensions = None;

        if let Some(path) = &self.path {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        if removed > 0 {
            info!(collection = %self.collection, removed, "Cleared vector store");
        }
        Ok(())
    }

    /// Write the collection to disk: temp file first, then rename over the
    /// previous version. No-op for in-memory stores.
    pub fn persist(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let snapshot = PersistedCollection {
            collection: self.collection.clone(),
            dimensions: self.dimensions,
            entries: self.entries.clone(),
        };
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec(&snapshot)?)?;
        fs::rename(&tmp, path)?;

        debug!(collection = %self.collection, entries = self.entries.len(), "Persisted vector store");
        Ok(())
    }

    /// Read-only view of the stored entries.
    pub fn inspect(&self) -> &[StoredEntry] {
        &self.entries
    }

    pub fn contains_source(&self, source: &str) -> bool {
        self.entries.iter().any(|e| e.source == source)
    }

    /// Distinct source filenames, in insertion order.
    pub fn sources(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .filter(|e| seen.insert(e.source.as_str()))
            .map(|e| e.source.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(source: &str, index: usize, content: &str) -> Chunk {
        Chunk {
            index,
            content: content.to_string(),
            source: source.to_string(),
            page_number: Some(1),
            char_offset: 0,
        }
    }

    fn sample_store() -> VectorStore {
        let mut store = VectorStore::in_memory("test");
        store
            .upsert(
                &[
                    chunk("a.pdf", 0, "north"),
                    chunk("a.pdf", 1, "east"),
                    chunk("b.pdf", 0, "north-east"),
                ],
                vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]],
            )
            .unwrap();
        store
    }

    #[test]
    fn query_orders_by_descending_similarity() {
        let store = sample_store();
        let results = store.query(&[1.0, 0.1], 3).unwrap();
        let order: Vec<&str> = results.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(order, vec!["north", "north-east", "east"]);
        assert!(results.windows(2).all(|w| w[0].similarity >= w[1].similarity));
    }

    #[test]
    fn query_returns_at_most_k() {
        let store = sample_store();
        assert_eq!(store.query(&[1.0, 0.0], 2).unwrap().len(), 2);
        assert_eq!(store.query(&[1.0, 0.0], 10).unwrap().len(), 3);
    }

    #[test]
    fn ties_break_by_source_then_index() {
        let mut store = VectorStore::in_memory("test");
        store
            .upsert(
                &[chunk("b.pdf", 0, "x"), chunk("a.pdf", 2, "y"), chunk("a.pdf", 1, "z")],
                vec![vec![1.0, 0.0]; 3],
            )
            .unwrap();
        let results = store.query(&[1.0, 0.0], 3).unwrap();
        let keys: Vec<(&str, usize)> = results.iter().map(|r| (r.source.as_str(), r.chunk_index)).collect();
        assert_eq!(keys, vec![("a.pdf", 1), ("a.pdf", 2), ("b.pdf", 0)]);
    }

    #[test]
    fn identical_chunks_are_stored_once() {
        let mut store = VectorStore::in_memory("test");
        let added = store
            .upsert(
                &[chunk("a.pdf", 0, "same"), chunk("a.pdf", 1, "same"), chunk("b.pdf", 0, "same")],
                vec![vec![1.0], vec![1.0], vec![1.0]],
            )
            .unwrap();
        assert_eq!(added, 2);
        assert_eq!(store.len(), 2);
        assert_eq!(store.sources(), vec!["a.pdf", "b.pdf"]);
    }

    #[test]
    fn empty_store_and_cleared_store_return_nothing() {
        let empty = VectorStore::in_memory("test");
        assert!(empty.query(&[1.0, 0.0], 5).unwrap().is_empty());

        let mut store = sample_store();
        store.clear().unwrap();
        assert!(store.query(&[1.0, 0.0], 5).unwrap().is_empty());
        assert!(store.is_empty());
        assert_eq!(store.dimensions(), None);
    }

    #[test]
    fn rejects_mismatched_input() {
        let mut store = sample_store();
        assert!(matches!(
            store.upsert(&[chunk("c.pdf", 0, "c")], vec![]),
            Err(StoreError::LengthMismatch { chunks: 1, vectors: 0 })
        ));
        assert!(matches!(
            store.upsert(&[chunk("c.pdf", 0, "c")], vec![vec![1.0, 2.0, 3.0]]),
            Err(StoreError::DimensionMismatch { expected: 2, actual: 3 })
        ));
        assert!(matches!(
            store.upsert(&[chunk("c.pdf", 0, "c")], vec![vec![f32::NAN, 0.0]]),
            Err(StoreError::InvalidVector { .. })
        ));
        assert!(matches!(
            store.query(&[1.0], 1),
            Err(StoreError::DimensionMismatch { .. })
        ));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn inspect_is_read_only_snapshot() {
        let store = sample_store();
        let before = store.inspect().to_vec();
        let _ = store.query(&[0.0, 1.0], 1).unwrap();
        assert_eq!(store.inspect(), before.as_slice());
        assert_eq!(before[0].id, entry_id("a.pdf", "north"));
    }

    #[test]
    fn persist_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = VectorStore::open(dir.path(), "pdfchat_ollama").unwrap();
            assert!(store.is_empty());
            store.upsert(&[chunk("a.pdf", 0, "hello")], vec![vec![0.5, 0.5]]).unwrap();
            store.persist().unwrap();
        }

        let reopened = VectorStore::open(dir.path(), "pdfchat_ollama").unwrap();
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.dimensions(), Some(2));
        assert_eq!(reopened.inspect()[0].content, "hello");
        assert!(!dir.path().join("pdfchat_ollama").join("store.json.tmp").exists());
    }

    #[test]
    fn clear_removes_persisted_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = VectorStore::open(dir.path(), "c").unwrap();
        store.upsert(&[chunk("a.pdf", 0, "hello")], vec![vec![1.0]]).unwrap();
        store.persist().unwrap();
        let path = store.path().unwrap().to_path_buf();
        assert!(path.exists());

        store.clear().unwrap();
        assert!(!path.exists());
        assert!(VectorStore::open(dir.path(), "c").unwrap().is_empty());
    }

    #[test]
    fn failed_replace_keeps_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = VectorStore::open(dir.path(), "c").unwrap();
        store
            .replace(&[chunk("sky.pdf", 0, "The sky is blue.")], vec![vec![1.0, 0.0]], None)
            .unwrap();

        let err = store
            .replace(
                &[chunk("grass.pdf", 0, "Grass is green."), chunk("grass.pdf", 1, "More grass.")],
                vec![vec![0.0, 1.0], vec![f32::NAN, 1.0]],
                None,
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidVector { index: 1, .. }));
        assert_eq!(store.sources(), vec!["sky.pdf"]);
        assert_eq!(VectorStore::open(dir.path(), "c").unwrap().sources(), vec!["sky.pdf"]);
    }

    #[test]
    fn replace_keeps_only_the_named_source() {
        let mut store = sample_store();
        let added = store
            .replace(&[chunk("c.pdf", 0, "south")], vec![vec![-1.0, 0.0]], Some("b.pdf"))
            .unwrap();
        assert_eq!(added, 1);
        assert_eq!(store.sources(), vec!["b.pdf", "c.pdf"]);
        assert!(store.contains_source("b.pdf"));
        assert!(!store.contains_source("a.pdf"));
    }

    #[test]
    fn append_is_all_or_nothing() {
        let mut store = sample_store();
        assert!(matches!(
            store.append(
                &[chunk("c.pdf", 0, "c"), chunk("c.pdf", 1, "d")],
                vec![vec![1.0, 0.0], vec![1.0]],
            ),
            Err(StoreError::DimensionMismatch { .. })
        ));
        assert_eq!(store.len(), 3);

        assert_eq!(store.append(&[chunk("c.pdf", 0, "c")], vec![vec![0.5, 0.5]]).unwrap(), 1);
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn cosine_of_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[2.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
    }
}
