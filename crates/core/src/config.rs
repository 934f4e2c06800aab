use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_usize(profile: &str, key: &str, default: usize) -> usize {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub rag: RagConfig,
    pub llm: LlmConfig,
    pub ollama: OllamaConfig,
    pub embedding: EmbeddingConfig,
    pub vector_store: VectorStoreConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `PDFCHAT_PROFILE`. When set (e.g. `PROD`), every
    /// key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("PDFCHAT_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            rag: RagConfig::from_env_profiled(p),
            llm: LlmConfig::from_env_profiled(p),
            ollama: OllamaConfig::from_env_profiled(p),
            embedding: EmbeddingConfig::from_env_profiled(p),
            vector_store: VectorStoreConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Reject settings that would make the pipeline misbehave.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.rag.validate()?;
        if self.embedding.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        Ok(())
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  rag:          chunk_size={}, overlap={}, top_k={}, style={}",
            self.rag.chunk_size,
            self.rag.chunk_overlap,
            self.rag.top_k,
            self.rag.prompt_style
        );
        tracing::info!(
            "  llm:          provider={}, model={}, keys=[groq:{}, google:{}, openai:{}]",
            self.llm.provider,
            self.llm.model.as_deref().unwrap_or("(catalog default)"),
            self.llm.groq_api_key.is_some(),
            self.llm.google_api_key.is_some(),
            self.llm.openai_api_key.is_some()
        );
        tracing::info!("  ollama:       url={}, model={}", self.ollama.url, self.ollama.model);
        tracing::info!(
            "  embedding:    provider={}, batch_size={}",
            self.embedding.provider,
            self.embedding.batch_size
        );
        tracing::info!(
            "  vector_store: dir={}, collection={}, base_corpus={}",
            self.vector_store.dir.display(),
            self.vector_store.collection,
            self.vector_store
                .base_corpus_path
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(none)".to_string())
        );
    }
}

// ── RAG parameters ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    /// Maximum characters per chunk.
    pub chunk_size: usize,
    /// Characters shared by consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of chunks retrieved per question.
    pub top_k: usize,
    /// "assistant" or "socratic".
    pub prompt_style: String,
}

impl RagConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            chunk_size: profiled_env_usize(p, "CHUNK_SIZE", 1000),
            chunk_overlap: profiled_env_usize(p, "CHUNK_OVERLAP", 200),
            top_k: profiled_env_usize(p, "TOP_K_RESULTS", 5),
            prompt_style: profiled_env_or(p, "PROMPT_STYLE", "assistant").to_lowercase(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ConfigError::OverlapTooLarge {
                size: self.chunk_size,
                overlap: self.chunk_overlap,
            });
        }
        if self.top_k == 0 {
            return Err(ConfigError::ZeroTopK);
        }
        match self.prompt_style.as_str() {
            "assistant" | "socratic" => Ok(()),
            other => Err(ConfigError::UnknownValue {
                key: "PROMPT_STYLE",
                value: other.to_string(),
            }),
        }
    }
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 5,
            prompt_style: "assistant".to_string(),
        }
    }
}

// ── LLM (Groq / Gemini / OpenAI / Ollama) ─────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "groq", "gemini", "openai", "ollama"
    pub provider: String,
    /// Model override; the catalog default for the provider is used when unset.
    pub model: Option<String>,
    pub groq_api_key: Option<String>,
    pub groq_base_url: String,
    pub google_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl LlmConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            provider: profiled_env_or(p, "LLM_PROVIDER", "groq").to_lowercase(),
            model: profiled_env_opt(p, "LLM_MODEL"),
            groq_api_key: profiled_env_opt(p, "GROQ_API_KEY"),
            groq_base_url: profiled_env_or(p, "GROQ_BASE_URL", "https://api.groq.com/openai"),
            google_api_key: profiled_env_opt(p, "GOOGLE_API_KEY"),
            openai_api_key: profiled_env_opt(p, "OPENAI_API_KEY"),
            openai_base_url: profiled_env_opt(p, "OPENAI_BASE_URL"),
            temperature: profiled_env_or(p, "LLM_TEMPERATURE", "0.7")
                .parse()
                .unwrap_or(0.7),
            max_tokens: profiled_env_u32(p, "LLM_MAX_TOKENS", 500),
        }
    }

    /// API key configured for a provider, if that provider needs one.
    pub fn api_key_for(&self, provider: &str) -> Option<&str> {
        match provider {
            "groq" => self.groq_api_key.as_deref(),
            "gemini" => self.google_api_key.as_deref(),
            "openai" => self.openai_api_key.as_deref(),
            _ => None,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "groq".to_string(),
            model: None,
            groq_api_key: None,
            groq_base_url: "https://api.groq.com/openai".to_string(),
            google_api_key: None,
            openai_api_key: None,
            openai_base_url: None,
            temperature: 0.7,
            max_tokens: 500,
        }
    }
}

// ── Ollama (local models) ─────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub url: String,
    pub model: String,
    pub embedding_model: String,
}

impl OllamaConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            url: profiled_env_or(p, "OLLAMA_URL", "http://localhost:11434"),
            model: profiled_env_or(p, "OLLAMA_MODEL", "llama3.2"),
            embedding_model: profiled_env_or(p, "OLLAMA_EMBEDDING_MODEL", "nomic-embed-text"),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:11434".to_string(),
            model: "llama3.2".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
        }
    }
}

// ── Embedding ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// "auto" (follow the LLM provider), "ollama", "openai", "gemini"
    pub provider: String,
    /// Expected vector size; the backend default is used when unset.
    pub dimensions: Option<usize>,
    pub batch_size: usize,
    /// LRU entries kept by the embedding cache (0 disables it).
    pub cache_size: usize,
    pub openai_model: String,
    pub gemini_model: String,
}

impl EmbeddingConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            provider: profiled_env_or(p, "EMBEDDING_PROVIDER", "auto").to_lowercase(),
            dimensions: profiled_env_opt(p, "EMBEDDING_DIMENSIONS").and_then(|v| v.parse().ok()),
            batch_size: profiled_env_usize(p, "EMBEDDING_BATCH_SIZE", 64),
            cache_size: profiled_env_usize(p, "EMBEDDING_CACHE_SIZE", 1024),
            openai_model: profiled_env_or(p, "OPENAI_EMBEDDING_MODEL", "text-embedding-3-small"),
            gemini_model: profiled_env_or(p, "GEMINI_EMBEDDING_MODEL", "models/embedding-001"),
        }
    }

    /// Embedding backend for the given LLM provider. Hosted Gemini and OpenAI
    /// embed with their own APIs; everything else embeds locally via Ollama.
    pub fn resolved_provider(&self, llm_provider: &str) -> String {
        if self.provider != "auto" {
            return self.provider.clone();
        }
        match llm_provider {
            "gemini" => "gemini".to_string(),
            "openai" => "openai".to_string(),
            _ => "ollama".to_string(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "auto".to_string(),
            dimensions: None,
            batch_size: 64,
            cache_size: 1024,
            openai_model: "text-embedding-3-small".to_string(),
            gemini_model: "models/embedding-001".to_string(),
        }
    }
}

// ── Vector store ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    /// Root directory; one sub-directory per collection.
    pub dir: PathBuf,
    /// Collection prefix, suffixed with the embedding provider.
    pub collection: String,
    /// JSON knowledge base indexed next to every submission. Unset means none.
    pub base_corpus_path: Option<PathBuf>,
}

impl VectorStoreConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            dir: PathBuf::from(profiled_env_or(p, "VECTOR_STORE_DIR", "data/vector_store")),
            collection: profiled_env_or(p, "COLLECTION_NAME", "pdfchat"),
            base_corpus_path: profiled_env_opt(p, "BASE_CORPUS_PATH").map(PathBuf::from),
        }
    }

    /// Collection name for an embedding backend. Vectors from different
    /// embedding models are never mixed in one collection.
    pub fn collection_for(&self, embedding_provider: &str) -> String {
        format!("{}_{}", self.collection, embedding_provider)
    }
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data/vector_store"),
            collection: "pdfchat".to_string(),
            base_corpus_path: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profile: String::new(),
            rag: RagConfig::default(),
            llm: LlmConfig::default(),
            ollama: OllamaConfig::default(),
            embedding: EmbeddingConfig::default(),
            vector_store: VectorStoreConfig::default(),
        }
    }
}
