pub mod gemini;
pub mod ollama;
pub mod openai;

use std::time::Duration;

use pdfchat_core::config::{LlmConfig, OllamaConfig};
use tracing::info;

use crate::catalog;
use crate::provider::{LlmError, LlmProvider};

pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(120))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Create the LLM provider for a catalog selection.
///
/// `api_key` overrides the key from config (e.g. a `--api-key` flag).
pub fn create_provider(
    llm_config: &LlmConfig,
    ollama_config: &OllamaConfig,
    provider: &str,
    model: &str,
    api_key: Option<&str>,
) -> Result<Box<dyn LlmProvider>, LlmError> {
    let info = catalog::find(provider).map_err(|e| LlmError::NotConfigured(e.to_string()))?;

    let key = || -> Result<String, LlmError> {
        api_key
            .or_else(|| llm_config.api_key_for(info.name))
            .map(str::to_string)
            .ok_or_else(|| {
                LlmError::NotConfigured(format!(
                    "{} not set",
                    info.api_key_env.unwrap_or("API key")
                ))
            })
    };

    let created: Box<dyn LlmProvider> = match info.name {
        "groq" => Box::new(openai::OpenAiCompatProvider::new(
            "groq",
            key()?,
            model.to_string(),
            llm_config.groq_base_url.clone(),
        )),
        "openai" => Box::new(openai::OpenAiCompatProvider::new(
            "openai",
            key()?,
            model.to_string(),
            llm_config
                .openai_base_url
                .clone()
                .unwrap_or_else(|| "https://api.openai.com".to_string()),
        )),
        "gemini" => Box::new(gemini::GeminiProvider::new(key()?, model.to_string())),
        "ollama" => Box::new(ollama::OllamaProvider::new(
            ollama_config.url.clone(),
            model.to_string(),
        )),
        other => {
            return Err(LlmError::NotConfigured(format!(
                "unknown LLM provider: '{}'",
                other
            )))
        }
    };

    info!(provider = info.name, model, "LLM provider ready");
    Ok(created)
}
