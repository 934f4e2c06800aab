use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding count mismatch: sent {expected} texts, got {actual} vectors")]
    CountMismatch { expected: usize, actual: usize },

    #[error("embedding provider not configured: {0}")]
    NotConfigured(String),
}

/// Trait for embedding backends (OpenAI, Ollama, Gemini).
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, returning one vector per input text (in order).
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// The dimensionality of the output vectors.
    fn dimensions(&self) -> usize;

    /// Provider/model label, e.g. `ollama/nomic-embed-text`.
    fn model_id(&self) -> String;

    /// Embed a single text.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embed_batch(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or(EmbeddingError::CountMismatch {
                expected: 1,
                actual: 0,
            })
    }
}

/// Check a backend response against the request before handing it out.
pub(crate) fn validate_embeddings(
    embeddings: &[Vec<f32>],
    expected_count: usize,
    expected_dims: usize,
) -> Result<(), EmbeddingError> {
    if embeddings.len() != expected_count {
        return Err(EmbeddingError::CountMismatch {
            expected: expected_count,
            actual: embeddings.len(),
        });
    }
    if let Some(bad) = embeddings.iter().find(|v| v.len() != expected_dims) {
        return Err(EmbeddingError::DimensionMismatch {
            expected: expected_dims,
            actual: bad.len(),
        });
    }
    Ok(())
}
