pub mod cache;
pub mod gemini;
pub mod ollama;
pub mod openai;
pub mod traits;

use std::sync::Arc;
use std::time::Duration;

use pdfchat_core::Config;
use reqwest::Client;
use tracing::info;

pub use cache::CachedEmbedder;
pub use gemini::GeminiEmbedder;
pub use ollama::OllamaEmbedder;
pub use openai::OpenAiEmbedder;
pub use traits::{Embedder, EmbeddingError};

/// Shared HTTP client settings for embedding backends.
pub(crate) fn http_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(120))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Build the embedder that pairs with `llm_provider`, wrapped in an LRU cache
/// unless `EMBEDDING_CACHE_SIZE` is 0.
pub fn create_embedder(
    config: &Config,
    llm_provider: &str,
) -> Result<Arc<dyn Embedder>, EmbeddingError> {
    let backend = config.embedding.resolved_provider(llm_provider);
    let dims = config.embedding.dimensions;

    let embedder: Arc<dyn Embedder> = match backend.as_str() {
        "ollama" => Arc::new(OllamaEmbedder::new(
            config.ollama.url.clone(),
            config.ollama.embedding_model.clone(),
            dims.unwrap_or(OllamaEmbedder::DEFAULT_DIMENSIONS),
        )),
        "openai" => {
            let key = config.llm.openai_api_key.clone().ok_or_else(|| {
                EmbeddingError::NotConfigured("OPENAI_API_KEY is not set".to_string())
            })?;
            Arc::new(OpenAiEmbedder::new(
                key,
                config.embedding.openai_model.clone(),
                config.llm.openai_base_url.clone(),
                dims.unwrap_or(OpenAiEmbedder::DEFAULT_DIMENSIONS),
            ))
        }
        "gemini" => {
            let key = config.llm.google_api_key.clone().ok_or_else(|| {
                EmbeddingError::NotConfigured("GOOGLE_API_KEY is not set".to_string())
            })?;
            Arc::new(GeminiEmbedder::new(
                key,
                config.embedding.gemini_model.clone(),
                dims.unwrap_or(GeminiEmbedder::DEFAULT_DIMENSIONS),
            ))
        }
        other => {
            return Err(EmbeddingError::NotConfigured(format!(
                "unknown embedding provider '{other}'"
            )))
        }
    };

    info!(
        backend = %backend,
        model = %embedder.model_id(),
        dimensions = embedder.dimensions(),
        "Embedder ready"
    );

    if config.embedding.cache_size > 0 {
        Ok(Arc::new(CachedEmbedder::new(embedder, config.embedding.cache_size)))
    } else {
        Ok(embedder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groq_embeds_locally() {
        let config = Config::default();
        let embedder = create_embedder(&config, "groq").unwrap();
        assert_eq!(embedder.model_id(), "ollama/nomic-embed-text");
        assert_eq!(embedder.dimensions(), 768);
    }

    #[test]
    fn hosted_backend_requires_key() {
        let config = Config::default();
        assert!(matches!(
            create_embedder(&config, "gemini"),
            Err(EmbeddingError::NotConfigured(_))
        ));
        assert!(matches!(
            create_embedder(&config, "openai"),
            Err(EmbeddingError::NotConfigured(_))
        ));
    }

    #[test]
    fn gemini_with_key() {
        let mut config = Config::default();
        config.llm.google_api_key = Some("test-key".to_string());
        config.embedding.dimensions = Some(512);
        let embedder = create_embedder(&config, "gemini").unwrap();
        assert_eq!(embedder.model_id(), "gemini/embedding-001");
        assert_eq!(embedder.dimensions(), 512);
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let mut config = Config::default();
        config.embedding.provider = "word2vec".to_string();
        assert!(matches!(
            create_embedder(&config, "groq"),
            Err(EmbeddingError::NotConfigured(_))
        ));
    }
}
