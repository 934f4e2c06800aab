//! Index-time pipeline: load → chunk → embed → store.

use pdfchat_core::UploadedFile;
use pdfchat_ingest::document::chunker::{chunk_document, Chunk, ChunkConfig};
use pdfchat_ingest::document::corpus::BaseCorpus;
use pdfchat_ingest::document::{load_batch, LoadFailure};
use pdfchat_ingest::embedding::{Embedder, EmbeddingError};
use thiserror::Error;
use tracing::info;

use crate::store::{StoreError, VectorStore};

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("no files were provided")]
    NoFiles,
    #[error("none of the uploaded files could be indexed: {}", describe_failures(.failures))]
    NothingIndexed { failures: Vec<LoadFailure> },
    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn describe_failures(failures: &[LoadFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({})", f.filename, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedDocument {
    pub filename: String,
    pub pages: usize,
    pub chunks: usize,
}

/// Outcome of indexing one submission.
#[derive(Debug)]
pub struct IndexReport {
    pub documents: Vec<IndexedDocument>,
    pub failures: Vec<LoadFailure>,
    /// Entries added to the store after de-duplication.
    pub chunks_stored: usize,
    /// Base corpus chunks embedded in this run; 0 when they were already stored.
    pub base_chunks: usize,
}

impl IndexReport {
    pub fn filenames(&self) -> Vec<String> {
        self.documents.iter().map(|d| d.filename.clone()).collect()
    }
}

pub struct Indexer<'a> {
    embedder: &'a dyn Embedder,
    chunk_config: ChunkConfig,
    batch_size: usize,
}

impl<'a> Indexer<'a> {
    pub fn new(embedder: &'a dyn Embedder, chunk_config: ChunkConfig, batch_size: usize) -> Self {
        Self {
            embedder,
            chunk_config,
            batch_size: batch_size.max(1),
        }
    }

    /// Index `files` as a new submission, replacing whatever `store` held.
    ///
    /// Files that fail to load are reported and skipped. The base corpus, when
    /// given, is kept next to the submission: its stored entries are reused if
    /// present, otherwise it is embedded with the submission. The store only
    /// changes once every chunk is embedded and the new contents are
    /// persisted, so a failed run leaves the previous submission searchable.
    pub async fn index(
        &self,
        files: &[UploadedFile],
        base: Option<&BaseCorpus>,
        store: &mut VectorStore,
    ) -> Result<IndexReport, IndexError> {
        if files.is_empty() {
            return Err(IndexError::NoFiles);
        }

        let loaded = load_batch(files);
        if loaded.is_empty() {
            return Err(IndexError::NothingIndexed {
                failures: loaded.failures,
            });
        }

        let mut documents = Vec::with_capacity(loaded.documents.len());
        let mut chunks: Vec<Chunk> = Vec::new();
        for doc in &loaded.documents {
            let doc_chunks = chunk_document(doc, &self.chunk_config);
            info!(
                "Chunked '{}': {} chunks (size={}, overlap={})",
                doc.filename,
                doc_chunks.len(),
                self.chunk_config.chunk_size(),
                self.chunk_config.chunk_overlap()
            );
            documents.push(IndexedDocument {
                filename: doc.filename.clone(),
                pages: doc.pages.len(),
                chunks: doc_chunks.len(),
            });
            chunks.extend(doc_chunks);
        }

        let kept = base.filter(|corpus| store.contains_source(corpus.source()));
        let mut base_chunks = 0;
        if let (Some(corpus), None) = (base, kept) {
            let corpus_chunks = corpus.chunks();
            base_chunks = corpus_chunks.len();
            chunks.extend(corpus_chunks);
        }

        let vectors = self.embed_chunks(&chunks).await?;
        let chunks_stored = store.replace(&chunks, vectors, kept.map(|c| c.source()))?;

        info!(
            documents = documents.len(),
            skipped = loaded.failures.len(),
            chunks = chunks_stored,
            base_chunks,
            collection = store.collection(),
            "Indexed submission"
        );

        Ok(IndexReport {
            documents,
            failures: loaded.failures,
            chunks_stored,
            base_chunks,
        })
    }

    /// Embed and store the base corpus unless the store already holds it.
    /// Returns the number of entries added.
    pub async fn add_base(&self, corpus: &BaseCorpus, store: &mut VectorStore) -> Result<usize, IndexError> {
        if store.contains_source(corpus.source()) {
            info!(corpus = corpus.source(), "Base corpus already loaded");
            return Ok(0);
        }

        let chunks = corpus.chunks();
        let vectors = self.embed_chunks(&chunks).await?;
        let added = store.append(&chunks, vectors)?;
        info!(
            corpus = corpus.source(),
            added,
            collection = store.collection(),
            "Added base corpus"
        );
        Ok(added)
    }

    async fn embed_chunks(&self, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let total_batches = chunks.len().div_ceil(self.batch_size);
        let mut vectors = Vec::with_capacity(chunks.len());

        for (i, batch) in chunks.chunks(self.batch_size).enumerate() {
            let texts: Vec<&str> = batch.iter().map(|c| c.content.as_str()).collect();
            let mut embeddings = self.embedder.embed_batch(&texts).await?;
            if embeddings.len() != texts.len() {
                return Err(EmbeddingError::CountMismatch {
                    expected: texts.len(),
                    actual: embeddings.len(),
                });
            }
            info!(
                "Embedded batch {}/{} ({} chunks) with {}",
                i + 1,
                total_batches,
                batch.len(),
                self.embedder.model_id()
            );
            vectors.append(&mut embeddings);
        }
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingEmbedder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }
        fn dimensions(&self) -> usize {
            2
        }
        fn model_id(&self) -> String {
            "test/counting".into()
        }
    }

    fn chunk(i: usize) -> Chunk {
        Chunk {
            index: i,
            content: format!("chunk number {i}"),
            source: "a.pdf".into(),
            page_number: Some(1),
            char_offset: 0,
        }
    }

    #[tokio::test]
    async fn embeds_in_batches() {
        let embedder = CountingEmbedder { calls: AtomicUsize::new(0) };
        let indexer = Indexer::new(&embedder, ChunkConfig::default(), 2);
        let chunks: Vec<Chunk> = (0..5).map(chunk).collect();

        let vectors = indexer.embed_chunks(&chunks).await.unwrap();
        assert_eq!(vectors.len(), 5);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn empty_upload_is_rejected() {
        let embedder = CountingEmbedder { calls: AtomicUsize::new(0) };
        let indexer = Indexer::new(&embedder, ChunkConfig::default(), 64);
        let mut store = VectorStore::in_memory("test");
        assert!(matches!(indexer.index(&[], None, &mut store).await, Err(IndexError::NoFiles)));
    }

    #[tokio::test]
    async fn all_bad_files_leave_store_untouched() {
        let embedder = CountingEmbedder { calls: AtomicUsize::new(0) };
        let indexer = Indexer::new(&embedder, ChunkConfig::default(), 64);
        let mut store = VectorStore::in_memory("test");
        store.upsert(&[chunk(0)], vec![vec![1.0, 1.0]]).unwrap();

        let files = vec![
            UploadedFile::new("notes.txt", b"plain".to_vec()),
            UploadedFile::new("broken.pdf", b"garbage".to_vec()),
        ];
        let err = indexer.index(&files, None, &mut store).await.unwrap_err();

        let IndexError::NothingIndexed { failures } = &err else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(failures.len(), 2);
        assert!(err.to_string().contains("notes.txt"));
        assert!(err.to_string().contains("broken.pdf"));
        assert_eq!(store.len(), 1);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    fn corpus() -> BaseCorpus {
        BaseCorpus::from_json(
            "platon.json",
            r#"[{"titulo": "Meno", "texto": "Virtue cannot be taught."},
                {"titulo": "Phaedo", "texto": "The soul is immortal."}]"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn base_corpus_is_added_once() {
        let embedder = CountingEmbedder { calls: AtomicUsize::new(0) };
        let indexer = Indexer::new(&embedder, ChunkConfig::default(), 64);
        let mut store = VectorStore::in_memory("test");
        let corpus = corpus();

        assert_eq!(indexer.add_base(&corpus, &mut store).await.unwrap(), 2);
        assert_eq!(indexer.add_base(&corpus, &mut store).await.unwrap(), 0);
        assert_eq!(store.len(), 2);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_submission_leaves_base_corpus_in_place() {
        let embedder = CountingEmbedder { calls: AtomicUsize::new(0) };
        let indexer = Indexer::new(&embedder, ChunkConfig::default(), 64);
        let mut store = VectorStore::in_memory("test");
        let corpus = corpus();
        indexer.add_base(&corpus, &mut store).await.unwrap();
        store.upsert(&[chunk(0)], vec![vec![1.0, 1.0]]).unwrap();

        let files = vec![UploadedFile::new("broken.pdf", b"garbage".to_vec())];
        assert!(indexer.index(&files, Some(&corpus), &mut store).await.is_err());
        assert_eq!(store.len(), 3);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
    }
}
