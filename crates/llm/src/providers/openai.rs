use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::provider::{chat_messages_json, LlmError, LlmProvider, Message};

/// Client for `/v1/chat/completions`. Serves OpenAI itself and any
/// compatible endpoint (Groq exposes one under `/openai`).
pub struct OpenAiCompatProvider {
    client: reqwest::Client,
    provider: String,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiCompatProvider {
    pub fn new(provider: &str, api_key: String, model: String, base_url: String) -> Self {
        Self {
            client: super::http_client(),
            provider: provider.to_string(),
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
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
            "temperature": temperature,
            "max_tokens": max_tokens,
        })
    }

    fn extract_content(resp: &serde_json::Value) -> Result<String, LlmError> {
        resp["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.trim().to_string())
            .ok_or_else(|| LlmError::ParseError("missing choices[0].message.content".into()))
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    async fn complete(
        &self,
        messages: Vec<Message>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = Self::build_request_body(&self.model, &messages, temperature, max_tokens);

        debug!(provider = %self.provider, model = %self.model, "chat completion request to {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError { status, body });
        }

        let resp: serde_json::Value = response.json().await?;
        Self::extract_content(&resp)
    }

    fn provider_name(&self) -> &str {
        &self.provider
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_carries_limits() {
        let messages = vec![Message::system("context"), Message::user("What color is the sky?")];
        let body = OpenAiCompatProvider::build_request_body("llama-3.1-8b-instant", &messages, 0.7, 500);

        assert_eq!(body["model"], "llama-3.1-8b-instant");
        assert_eq!(body["max_tokens"], 500);
        assert_eq!(body["messages"].as_array().unwrap().len(), 2);
        assert_eq!(body["messages"][0]["role"], "system");
        let temp = body["temperature"].as_f64().unwrap();
        assert!((temp - 0.7).abs() < 1e-6);
    }

    #[test]
    fn extracts_first_choice() {
        let resp = json!({
            "choices": [{ "message": { "role": "assistant", "content": "  The sky is blue.\n" } }]
        });
        assert_eq!(OpenAiCompatProvider::extract_content(&resp).unwrap(), "The sky is blue.");
    }

    #[test]
    fn missing_choice_is_parse_error() {
        let resp = json!({ "choices": [] });
        assert!(matches!(
            OpenAiCompatProvider::extract_content(&resp),
            Err(LlmError::ParseError(_))
        ));
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let p = OpenAiCompatProvider::new("groq", "k".into(), "m".into(), "https://api.groq.com/openai/".into());
        assert_eq!(p.base_url, "https://api.groq.com/openai");
        assert_eq!(p.provider_name(), "groq");
    }
}
