use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::traits::{validate_embeddings, Embedder, EmbeddingError};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Embedder backed by the Google Generative Language API.
pub struct GeminiEmbedder {
    client: Client,
    api_key: String,
    /// Fully qualified model name, e.g. `models/embedding-001`.
    model: String,
    base_url: String,
    dimensions: usize,
}

impl GeminiEmbedder {
    pub const DEFAULT_DIMENSIONS: usize = 768;

    pub fn new(api_key: String, model: String, dimensions: usize) -> Self {
        let model = if model.starts_with("models/") {
            model
        } else {
            format!("models/{model}")
        };
        Self {
            client: super::http_client(),
            api_key,
            model,
            base_url: GEMINI_BASE_URL.to_string(),
            dimensions,
        }
    }

    /// Point the embedder at a different API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn build_request_body(model: &str, texts: &[&str]) -> serde_json::Value {
        let requests: Vec<serde_json::Value> = texts
            .iter()
            .map(|text| {
                json!({
                    "model": model,
                    "content": { "parts": [{ "text": text }] },
                    "taskType": "RETRIEVAL_DOCUMENT",
                })
            })
            .collect();
        json!({ "requests": requests })
    }
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let url = format!(
            "{}/{}:batchEmbedContents?key={}",
            self.base_url, self.model, self.api_key
        );
        let body = Self::build_request_body(&self.model, texts);

        debug!(model = %self.model, count = texts.len(), "Gemini embedding request");

        let response = self.client.post(&url).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Api(format!("{status}: {body}")));
        }

        let parsed: BatchEmbedResponse = response.json().await?;
        let embeddings: Vec<Vec<f32>> = parsed.embeddings.into_iter().map(|e| e.values).collect();
        validate_embeddings(&embeddings, texts.len(), self.dimensions)?;

        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> String {
        format!("gemini/{}", self.model.trim_start_matches("models/"))
    }
}
