use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use lru::LruCache;
use sha2::{Digest, Sha256};

use super::traits::{Embedder, EmbeddingError};

/// SHA-256 of the text. Distinct texts never share an entry in practice.
type CacheKey = [u8; 32];

struct CacheState {
    entries: LruCache<CacheKey, Vec<f32>>,
    hits: u64,
    misses: u64,
}

/// Embedder wrapper that serves repeated texts from an LRU cache.
///
/// Valid because embeddings are deterministic for a given text and model.
/// The lock is never held across the inner embedder's await point.
pub struct CachedEmbedder {
    inner: Arc<dyn Embedder>,
    state: Mutex<CacheState>,
}

impl CachedEmbedder {
    pub fn new(inner: Arc<dyn Embedder>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            state: Mutex::new(CacheState {
                entries: LruCache::new(capacity),
                hits: 0,
                misses: 0,
            }),
        }
    }

    fn cache_key(text: &str) -> CacheKey {
        Sha256::digest(text.as_bytes()).into()
    }

    fn state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn hits(&self) -> u64 {
        self.state().hits
    }

    pub fn misses(&self) -> u64 {
        self.state().misses
    }

    pub fn hit_rate(&self) -> f64 {
        let state = self.state();
        let total = state.hits + state.misses;
        if total == 0 {
            0.0
        } else {
            state.hits as f64 / total as f64
        }
    }

    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().entries.is_empty()
    }
}

#[async_trait]
impl Embedder for CachedEmbedder {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut results: Vec<Option<Vec<f32>>> = Vec::with_capacity(texts.len());
        let mut missing: Vec<(usize, &str)> = Vec::new();

        {
            let mut state = self.state();
            for (i, text) in texts.iter().enumerate() {
                let cached = state.entries.get(&Self::cache_key(text)).cloned();
                match cached {
                    Some(vector) => {
                        state.hits += 1;
                        results.push(Some(vector));
                    }
                    None => {
                        state.misses += 1;
                        results.push(None);
                        missing.push((i, text));
                    }
                }
            }
        }

        if !missing.is_empty() {
            let batch: Vec<&str> = missing.iter().map(|(_, text)| *text).collect();
            let fresh = self.inner.embed_batch(&batch).await?;
            if fresh.len() != batch.len() {
                return Err(EmbeddingError::CountMismatch {
                    expected: batch.len(),
                    actual: fresh.len(),
                });
            }

            let mut state = self.state();
            for ((i, text), vector) in missing.into_iter().zip(fresh) {
                state.entries.put(Self::cache_key(text), vector.clone());
                results[i] = Some(vector);
            }
        }

        Ok(results.into_iter().flatten().collect())
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn model_id(&self) -> String {
        self.inner.model_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingEmbedder {
        texts_embedded: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            self.texts_embedded.fetch_add(texts.len(), Ordering::SeqCst);
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }

        fn dimensions(&self) -> usize {
            2
        }

        fn model_id(&self) -> String {
            "test/counting".to_string()
        }
    }

    fn counting() -> Arc<CountingEmbedder> {
        Arc::new(CountingEmbedder {
            texts_embedded: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn cache_hit_and_miss() {
        let inner = counting();
        let cached = CachedEmbedder::new(inner.clone(), 100);

        let first = cached.embed_batch(&["hello"]).await.unwrap();
        assert_eq!(cached.misses(), 1);
        assert_eq!(cached.hits(), 0);

        let second = cached.embed_batch(&["hello"]).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(cached.hits(), 1);
        assert_eq!(inner.texts_embedded.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn only_missing_texts_reach_inner_embedder() {
        let inner = counting();
        let cached = CachedEmbedder::new(inner.clone(), 100);

        cached.embed_batch(&["a", "bb"]).await.unwrap();
        let out = cached.embed_batch(&["bb", "ccc", "a"]).await.unwrap();

        assert_eq!(out, vec![vec![2.0, 1.0], vec![3.0, 1.0], vec![1.0, 1.0]]);
        assert_eq!(inner.texts_embedded.load(Ordering::SeqCst), 3);
        assert_eq!(cached.len(), 3);
    }

    #[tokio::test]
    async fn cache_eviction() {
        let inner = counting();
        let cached = CachedEmbedder::new(inner.clone(), 2);

        cached.embed_batch(&["a", "b", "c"]).await.unwrap(); // "a" evicted
        cached.embed_batch(&["a"]).await.unwrap();

        assert_eq!(inner.texts_embedded.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn hit_rate_calculation() {
        let cached = CachedEmbedder::new(counting(), 100);
        assert_eq!(cached.hit_rate(), 0.0);

        cached.embed_batch(&["x"]).await.unwrap(); // miss
        cached.embed_batch(&["x"]).await.unwrap(); // hit
        assert!((cached.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn cache_key_depends_on_full_text() {
        assert_eq!(CachedEmbedder::cache_key("sky"), CachedEmbedder::cache_key("sky"));
        assert_ne!(CachedEmbedder::cache_key("sky"), CachedEmbedder::cache_key("sky "));
        assert_ne!(CachedEmbedder::cache_key(""), CachedEmbedder::cache_key("\0"));
    }

    #[tokio::test]
    async fn distinct_texts_keep_their_own_vectors() {
        let inner = counting();
        let cached = CachedEmbedder::new(inner.clone(), 4096);
        let texts: Vec<String> = (0..2000).map(|i| "x".repeat(i % 50 + 1) + &i.to_string()).collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();

        cached.embed_batch(&refs).await.unwrap();
        let again = cached.embed_batch(&refs).await.unwrap();

        for (text, vector) in texts.iter().zip(&again) {
            assert_eq!(vector[0], text.len() as f32);
        }
        assert_eq!(inner.texts_embedded.load(Ordering::SeqCst), texts.len());
        assert_eq!(cached.len(), texts.len());
    }
}
