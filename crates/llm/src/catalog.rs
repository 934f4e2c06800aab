//! Providers and models selectable at runtime.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderInfo {
    /// Lowercase key used in config and on the command line.
    pub name: &'static str,
    /// Display label.
    pub label: &'static str,
    /// Selectable models; the first is the default. Empty means any model
    /// name is accepted (local backends).
    pub models: &'static [&'static str],
    /// Environment variable holding the API key, if one is required.
    pub api_key_env: Option<&'static str>,
    pub playground: &'static str,
    pub is_local: bool,
}

impl ProviderInfo {
    pub fn requires_api_key(&self) -> bool {
        self.api_key_env.is_some()
    }
}

pub const PROVIDERS: &[ProviderInfo] = &[
    ProviderInfo {
        name: "gemini",
        label: "Gemini",
        models: &["gemini-2.0-flash-exp", "gemini-1.5-flash"],
        api_key_env: Some("GOOGLE_API_KEY"),
        playground: "https://ai.google.dev",
        is_local: false,
    },
    ProviderInfo {
        name: "groq",
        label: "Groq",
        models: &["llama-3.1-8b-instant", "llama3-70b-8192"],
        api_key_env: Some("GROQ_API_KEY"),
        playground: "https://console.groq.com/",
        is_local: false,
    },
    ProviderInfo {
        name: "openai",
        label: "OpenAI",
        models: &["gpt-4o-mini", "gpt-4o"],
        api_key_env: Some("OPENAI_API_KEY"),
        playground: "https://platform.openai.com/playground",
        is_local: false,
    },
    ProviderInfo {
        name: "ollama",
        label: "Ollama (local)",
        models: &[],
        api_key_env: None,
        playground: "local",
        is_local: true,
    },
];

#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    #[error("unknown provider '{0}' (expected one of: gemini, groq, openai, ollama)")]
    UnknownProvider(String),
    #[error("model '{model}' is not offered by {provider}")]
    UnknownModel { provider: String, model: String },
}

/// Look up a provider by name or label, case-insensitively.
pub fn find(provider: &str) -> Result<&'static ProviderInfo, CatalogError> {
    let wanted = provider.trim().to_lowercase();
    PROVIDERS
        .iter()
        .find(|p| p.name == wanted || p.label.to_lowercase() == wanted)
        .ok_or_else(|| CatalogError::UnknownProvider(provider.to_string()))
}

/// Default model for a provider. Local providers have no fixed list, so the
/// caller supplies the configured model.
pub fn default_model(provider: &str, local_model: &str) -> Result<String, CatalogError> {
    let info = find(provider)?;
    Ok(info
        .models
        .first()
        .map(|m| m.to_string())
        .unwrap_or_else(|| local_model.to_string()))
}

/// Check that `model` is offered by `provider`.
pub fn validate_model(provider: &str, model: &str) -> Result<&'static ProviderInfo, CatalogError> {
    let info = find(provider)?;
    if info.models.is_empty() || info.models.contains(&model) {
        Ok(info)
    } else {
        Err(CatalogError::UnknownModel {
            provider: info.name.to_string(),
            model: model.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_by_name_or_label() {
        assert_eq!(find("groq").unwrap().label, "Groq");
        assert_eq!(find("Gemini").unwrap().name, "gemini");
        assert_eq!(find(" OLLAMA ").unwrap().name, "ollama");
        assert!(matches!(find("claude"), Err(CatalogError::UnknownProvider(_))));
    }

    #[test]
    fn default_model_is_first_listed() {
        assert_eq!(default_model("groq", "x").unwrap(), "llama-3.1-8b-instant");
        assert_eq!(default_model("gemini", "x").unwrap(), "gemini-2.0-flash-exp");
        assert_eq!(default_model("ollama", "llama3.2").unwrap(), "llama3.2");
    }

    #[test]
    fn validate_model_checks_list() {
        assert!(validate_model("groq", "llama3-70b-8192").is_ok());
        assert_eq!(
            validate_model("groq", "gpt-4o"),
            Err(CatalogError::UnknownModel {
                provider: "groq".to_string(),
                model: "gpt-4o".to_string(),
            })
        );
        assert!(validate_model("ollama", "anything-local").is_ok());
    }

    #[test]
    fn hosted_providers_need_keys() {
        for p in PROVIDERS {
            assert_eq!(p.requires_api_key(), !p.is_local, "{}", p.name);
        }
    }
}
