use anyhow::{Context, Result};
use pdfchat_llm::catalog;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;

/// CLI configuration loaded from TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Provider used when `--provider` is not given (groq, gemini, openai, ollama)
    #[serde(default)]
    pub default_provider: Option<String>,

    /// Default model per provider
    #[serde(default)]
    pub default_models: HashMap<String, String>,

    /// API keys keyed by provider name
    #[serde(default)]
    pub api_keys: HashMap<String, String>,

    /// Always start in developer mode
    #[serde(default)]
    pub developer: bool,
}

impl CliConfig {
    /// Return the default config directory path: ~/.config/pdfchat/
    pub fn default_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("could not determine user config directory")?
            .join("pdfchat");
        Ok(config_dir)
    }

    /// Return the default config file path.
    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::default_config_dir()?.join("config.toml"))
    }

    /// Load config from the given path, or the default path.
    /// Returns default config if the file does not exist.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config_path = match path {
            Some(p) => PathBuf::from(p),
            None => Self::default_config_path()?,
        };

        if config_path.exists() {
            debug!(?config_path, "Loading config");
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("failed to read config: {}", config_path.display()))?;
            let config: Self = toml::from_str(&content)
                .with_context(|| format!("failed to parse config: {}", config_path.display()))?;
            Ok(config)
        } else {
            debug!(?config_path, "Config file not found, using defaults");
            let config = Self::default();
            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent).ok();
            }
            let toml_str = toml::to_string_pretty(&config)
                .context("failed to serialize default config")?;
            std::fs::write(&config_path, toml_str).ok();
            Ok(config)
        }
    }

    /// Resolve an API key for the given provider.
    /// Priority: cli_override > env var > config file.
    pub fn resolve_api_key(&self, provider: &str, cli_override: Option<&str>) -> Option<String> {
        if let Some(key) = cli_override {
            return Some(key.to_string());
        }

        let env_var = catalog::find(provider).ok().and_then(|p| p.api_key_env);
        if let Some(key) = env_var.and_then(|var| std::env::var(var).ok()) {
            if !key.is_empty() {
                return Some(key);
            }
        }

        self.api_keys.get(provider).cloned()
    }

    /// Resolve the model name for a provider.
    /// Priority: cli_override > config file. `None` means the catalog default.
    pub fn resolve_model(&self, provider: &str, cli_override: Option<&str>) -> Option<String> {
        cli_override
            .map(str::to_string)
            .or_else(|| self.default_models.get(provider).cloned())
    }
}
