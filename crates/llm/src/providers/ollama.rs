use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::provider::{chat_messages_json, LlmError, LlmProvider, Message};

/// Local models served by Ollama's `/api/chat`.
pub struct OllamaProvider {
    client: reqwest::Client,
    url: String,
    model: String,
}

impl OllamaProvider {
    pub fn new(url: String, model: String) -> Self {
        Self {
            client: super::http_client(),
            url: url.trim_end_matches('/').to_string(),
            model,
        }
    }

    fn build_request_body(
        model: &str,
        messages: &[Message],
        temperature: f32,
        max_tokens: u32,
    ) -> serde_json::Value {
        json!({
            "model": model,
            "messages": chat_messages_json(messages),
            "stream": false,
            "options": {
                "temperature": temperature,
                "num_predict": max_tokens,
            },
        })
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn complete(
        &self,
        messages: Vec<Message>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let url = format!("{}/api/chat", self.url);
        let body = Self::build_request_body(&self.model, &messages, temperature, max_tokens);

        debug!(model = %self.model, "Ollama request to {}", url);

        let response = self.client.post(&url).json(&body).send().await?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError { status, body });
        }

        let resp: serde_json::Value = response.json().await?;
        let content = resp["message"]["content"]
            .as_str()
            .ok_or_else(|| LlmError::ParseError("missing message.content".into()))?
            .trim()
            .to_string();

        Ok(content)
    }

    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
