use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::provider::{LlmError, LlmProvider, Message, Role};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: super::http_client(),
            api_key,
            model,
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Build the request body for the Gemini generateContent API.
    fn build_request_body(
        messages: &[Message],
        temperature: f32,
        max_tokens: u32,
    ) -> serde_json::Value {
        // System messages go into system_instruction; several are joined.
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();

        let contents: Vec<serde_json::Value> = messages
            .iter()
            .filter_map(|m| {
                let role = match m.role {
                    Role::System => return None,
                    Role::User => "user",
                    Role::Assistant => "model",
                };
                Some(json!({
                    "role": role,
                    "parts": [{ "text": m.content }],
                }))
            })
            .collect();

        let mut body = json!({
            "contents": contents,
            "generationConfig": {
                "temperature": temperature,
                "maxOutputTokens": max_tokens,
            },
        });

        if !system.is_empty() {
            body["system_instruction"] = json!({
                "parts": [{ "text": system.join("\n\n") }],
            });
        }

        body
    }

    /// Concatenate the text parts of the first candidate.
    fn extract_content(resp: &serde_json::Value) -> Result<String, LlmError> {
        let candidate = &resp["candidates"][0];
        let parts = candidate["content"]["parts"].as_array().ok_or_else(|| {
            match candidate["finishReason"].as_str() {
                Some(reason) => LlmError::ParseError(format!("no content, finishReason={reason}")),
                None => LlmError::ParseError("missing candidates[0].content.parts".into()),
            }
        })?;

        let text: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();
        Ok(text.trim().to_string())
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn complete(
        &self,
        messages: Vec<Message>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key,
        );

        let body = Self::build_request_body(&messages, temperature, max_tokens);

        debug!("Gemini request to model={}", self.model);

        let response = self.client.post(&url).json(&body).send().await?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError { status, body });
        }

        let resp: serde_json::Value = response.json().await?;
        Self::extract_content(&resp)
    }

    fn provider_name(&self) -> &str {
        "gemini"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
