//! Chat session: the explicit context object every user action runs against.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use pdfchat_core::{Config, UploadedFile};
use pdfchat_ingest::document::chunker::{ChunkConfig, ChunkConfigError};
use pdfchat_ingest::document::corpus::{BaseCorpus, CorpusError};
use pdfchat_ingest::embedding::{create_embedder, Embedder, EmbeddingError};
use pdfchat_llm::{catalog, create_provider, CatalogError, LlmError, LlmProvider};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::chain::{ChainError, ChainSettings, RetrievalChain};
use crate::export::{self, ExportError};
use crate::history::{HistoryLog, Turn};
use crate::index::{IndexError, IndexReport, Indexer};
use crate::prompt::PromptStyle;
use crate::store::{SearchResult, StoreError, VectorStore};

/// Results returned by a developer inspection query.
pub const INSPECT_K: usize = 3;
/// Characters of chunk text shown per inspection hit.
pub const INSPECT_PREVIEW_CHARS: usize = 300;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no documents indexed: upload PDFs before asking questions")]
    NoDocuments,
    #[error("question is empty")]
    EmptyQuestion,
    #[error("invalid chunking settings: {0}")]
    ChunkConfig(#[from] ChunkConfigError),
    #[error("invalid prompt style: {0}")]
    PromptStyle(String),
    #[error(transparent)]
    Corpus(#[from] CorpusError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

// ── Backends ───────────────────────────────────────

/// Builds the LLM and embedding clients for a provider selection.
pub trait Backends: Send + Sync {
    fn llm(&self, provider: &str, model: &str) -> Result<Box<dyn LlmProvider>, LlmError>;

    /// Embedder paired with `llm_provider`.
    fn embedder(&self, llm_provider: &str) -> Result<Arc<dyn Embedder>, EmbeddingError>;
}

/// Backends built from environment config, plus per-provider API keys that
/// take precedence over the environment (from `--api-key` or a config file).
pub struct ConfiguredBackends {
    config: Config,
    api_keys: HashMap<String, String>,
}

impl ConfiguredBackends {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            api_keys: HashMap::new(),
        }
    }

    pub fn with_api_key(mut self, provider: &str, key: String) -> Self {
        self.api_keys.insert(provider.to_string(), key);
        self
    }
}

impl Backends for ConfiguredBackends {
    fn llm(&self, provider: &str, model: &str) -> Result<Box<dyn LlmProvider>, LlmError> {
        let key = self.api_keys.get(provider).map(String::as_str);
        create_provider(&self.config.llm, &self.config.ollama, provider, model, key)
    }

    fn embedder(&self, llm_provider: &str) -> Result<Arc<dyn Embedder>, EmbeddingError> {
        let mut config = self.config.clone();
        if let Some(key) = self.api_keys.get("gemini") {
            config.llm.google_api_key = Some(key.clone());
        }
        if let Some(key) = self.api_keys.get("openai") {
            config.llm.openai_api_key = Some(key.clone());
        }
        create_embedder(&config, llm_provider)
    }
}

// ── Session ────────────────────────────────────────

/// Provider/model pair in use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub provider: String,
    pub model: String,
}

impl ModelSelection {
    /// Validate against the catalog, falling back to the provider's default model.
    pub fn resolve(provider: &str, model: Option<&str>, local_model: &str) -> Result<Self, CatalogError> {
        let info = catalog::find(provider)?;
        let model = match model {
            Some(m) => {
                catalog::validate_model(info.name, m)?;
                m.to_string()
            }
            None => catalog::default_model(info.name, local_model)?,
        };
        Ok(Self {
            provider: info.name.to_string(),
            model,
        })
    }

    pub fn label(&self) -> &'static str {
        catalog::find(&self.provider).map(|p| p.label).unwrap_or("Unknown")
    }
}

/// Outcome of switching provider or model.
#[derive(Debug)]
pub struct ModelChange {
    pub selection: ModelSelection,
    pub embedding_backend: String,
    /// Present when the embedding backend changed and PDFs were re-indexed.
    pub reindexed: Option<IndexReport>,
}

/// A developer inspection hit.
#[derive(Debug, Clone, PartialEq)]
pub struct InspectHit {
    pub source: String,
    pub page_number: Option<usize>,
    pub similarity: f32,
    pub preview: String,
}

struct ActiveBackends {
    selection: ModelSelection,
    llm: Box<dyn LlmProvider>,
    embedder: Arc<dyn Embedder>,
    embedding_backend: String,
    store: VectorStore,
}

pub struct ChatSession {
    id: Uuid,
    config: Config,
    backends: Box<dyn Backends>,
    default_selection: ModelSelection,
    active: ActiveBackends,
    chunk_config: ChunkConfig,
    settings: ChainSettings,
    base: Option<BaseCorpus>,
    /// Files of the current submission that loaded, kept for re-indexing.
    submitted: Vec<UploadedFile>,
    indexed: Vec<String>,
    history: HistoryLog,
}

impl ChatSession {
    /// Start a session. Any vectors left in the collection by a previous run
    /// are discarded so they cannot leak into retrieval. A configured base
    /// corpus is read here and embedded by [`load_base_corpus`](Self::load_base_corpus).
    pub fn new(
        config: Config,
        backends: Box<dyn Backends>,
        selection: ModelSelection,
    ) -> Result<Self, SessionError> {
        let chunk_config = ChunkConfig::new(config.rag.chunk_size, config.rag.chunk_overlap)?;
        let style: PromptStyle = config
            .rag
            .prompt_style
            .parse()
            .map_err(SessionError::PromptStyle)?;
        let settings = ChainSettings {
            top_k: config.rag.top_k,
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
            style,
        };

        let base = config
            .vector_store
            .base_corpus_path
            .as_deref()
            .map(BaseCorpus::load)
            .transpose()?;

        let mut active = Self::activate(&config, backends.as_ref(), &selection)?;
        if !active.store.is_empty() {
            warn!(
                entries = active.store.len(),
                collection = active.store.collection(),
                "Discarding vectors left by a previous run"
            );
        }
        active.store.clear()?;

        let id = Uuid::new_v4();
        info!(session = %id, provider = %selection.provider, model = %selection.model, "Session started");

        Ok(Self {
            id,
            config,
            backends,
            default_selection: selection,
            active,
            chunk_config,
            settings,
            base,
            submitted: Vec::new(),
            indexed: Vec::new(),
            history: HistoryLog::new(),
        })
    }

    fn activate(
        config: &Config,
        backends: &dyn Backends,
        selection: &ModelSelection,
    ) -> Result<ActiveBackends, SessionError> {
        let llm = backends.llm(&selection.provider, &selection.model)?;
        let embedder = backends.embedder(&selection.provider)?;
        let embedding_backend = config.embedding.resolved_provider(&selection.provider);
        let store = VectorStore::open(
            &config.vector_store.dir,
            &config.vector_store.collection_for(&embedding_backend),
        )?;
        Ok(ActiveBackends {
            selection: selection.clone(),
            llm,
            embedder,
            embedding_backend,
            store,
        })
    }

    fn indexer<'a>(&self, embedder: &'a dyn Embedder) -> Indexer<'a> {
        Indexer::new(embedder, self.chunk_config, self.config.embedding.batch_size)
    }

    /// Index a new submission, replacing the previous one. On any failure
    /// the previous submission stays in place.
    pub async fn upload(&mut self, mut files: Vec<UploadedFile>) -> Result<IndexReport, SessionError> {
        let embedder = Arc::clone(&self.active.embedder);
        let report = self
            .indexer(embedder.as_ref())
            .index(&files, self.base.as_ref(), &mut self.active.store)
            .await?;

        self.indexed = report.filenames();
        files.retain(|f| self.indexed.contains(&f.name));
        self.submitted = files;
        Ok(report)
    }

    /// Embed the base corpus into the active collection unless it is already
    /// there. Returns the number of entries added; 0 without a base corpus.
    pub async fn load_base_corpus(&mut self) -> Result<usize, SessionError> {
        let Some(corpus) = &self.base else {
            return Ok(0);
        };
        let embedder = Arc::clone(&self.active.embedder);
        let added = Indexer::new(embedder.as_ref(), self.chunk_config, self.config.embedding.batch_size)
            .add_base(corpus, &mut self.active.store)
            .await?;
        Ok(added)
    }

    /// Answer a question and record the turn. Nothing is recorded on failure.
    pub async fn submit(&mut self, question: &str) -> Result<Turn, SessionError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(SessionError::EmptyQuestion);
        }
        if self.indexed.is_empty() && self.base.is_none() {
            return Err(SessionError::NoDocuments);
        }
        self.load_base_corpus().await?;
        if self.active.store.is_empty() {
            return Err(SessionError::NoDocuments);
        }

        let mut chain = RetrievalChain::new(
            self.active.embedder.as_ref(),
            self.active.llm.as_ref(),
            &self.active.store,
            self.settings,
        );
        let answer = chain.run(question).await?;

        let turn = Turn {
            question: question.to_string(),
            answer: answer.answer,
            provider: self.active.selection.label().to_string(),
            model: self.active.selection.model.clone(),
            sources: answer.sources,
            timestamp: Utc::now(),
        };
        self.history.push(turn.clone());
        Ok(turn)
    }

    /// Clear history, documents and vectors, and go back to the start-up
    /// provider and model.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        self.clear_chat()?;
        if self.active.selection != self.default_selection {
            let mut active = Self::activate(&self.config, self.backends.as_ref(), &self.default_selection)?;
            active.store.clear()?;
            self.active = active;
        }
        info!(session = %self.id, "Session reset");
        Ok(())
    }

    /// Clear history, documents and vectors; keep the provider and model.
    pub fn clear_chat(&mut self) -> Result<(), SessionError> {
        self.history.clear();
        self.submitted.clear();
        self.indexed.clear();
        self.active.store.clear()?;
        Ok(())
    }

    /// Remove the most recent turn. `None` when there is nothing to undo.
    pub fn undo(&mut self) -> Option<Turn> {
        self.history.undo()
    }

    pub fn export_csv(&self) -> Result<String, SessionError> {
        Ok(export::to_csv_string(self.history.turns())?)
    }

    /// Write the history to `path`, returning the number of rows.
    pub fn export_to(&self, path: &Path) -> Result<usize, SessionError> {
        Ok(export::export_to_path(self.history.turns(), path)?)
    }

    /// Switch provider and model. If the embedding backend changes, the
    /// submitted PDFs are re-indexed with the new embedder; on any failure
    /// the current selection stays active.
    pub async fn select_model(
        &mut self,
        provider: &str,
        model: Option<&str>,
    ) -> Result<ModelChange, SessionError> {
        let selection = ModelSelection::resolve(provider, model, &self.config.ollama.model)?;
        let backend = self.config.embedding.resolved_provider(&selection.provider);

        if backend == self.active.embedding_backend {
            self.active.llm = self.backends.llm(&selection.provider, &selection.model)?;
            self.active.selection = selection.clone();
            info!(provider = %selection.provider, model = %selection.model, "Model switched");
            return Ok(ModelChange {
                selection,
                embedding_backend: backend,
                reindexed: None,
            });
        }

        let mut next = Self::activate(&self.config, self.backends.as_ref(), &selection)?;
        let embedder = Arc::clone(&next.embedder);
        let indexer = self.indexer(embedder.as_ref());
        let keep = self.base.as_ref().map(|c| c.source());
        let reindexed = if self.submitted.is_empty() {
            next.store.replace(&[], Vec::new(), keep)?;
            if let Some(corpus) = &self.base {
                indexer.add_base(corpus, &mut next.store).await?;
            }
            None
        } else {
            Some(indexer.index(&self.submitted, self.base.as_ref(), &mut next.store).await?)
        };

        info!(
            provider = %selection.provider,
            model = %selection.model,
            from = %self.active.embedding_backend,
            to = %next.embedding_backend,
            "Embedding backend switched"
        );
        self.active.store.clear()?;
        self.active = next;
        if let Some(report) = &reindexed {
            self.indexed = report.filenames();
            let indexed = &self.indexed;
            self.submitted.retain(|f| indexed.contains(&f.name));
        }

        Ok(ModelChange {
            selection,
            embedding_backend: backend,
            reindexed,
        })
    }

    /// Developer query: closest chunks with short previews. Does not touch history.
    pub async fn inspect(&self, query: &str) -> Result<Vec<SearchResult>, SessionError> {
        let vector = self.active.embedder.embed_one(query).await?;
        Ok(self.active.store.query(&vector, INSPECT_K)?)
    }

    /// Same as [`inspect`](Self::inspect) with previews truncated for display.
    pub async fn inspect_previews(&self, query: &str) -> Result<Vec<InspectHit>, SessionError> {
        Ok(self
            .inspect(query)
            .await?
            .into_iter()
            .map(|r| InspectHit {
                preview: preview(&r.content, INSPECT_PREVIEW_CHARS),
                source: r.source,
                page_number: r.page_number,
                similarity: r.similarity,
            })
            .collect())
    }

    pub fn history(&self) -> &[Turn] {
        self.history.turns()
    }

    pub fn base_corpus(&self) -> Option<&BaseCorpus> {
        self.base.as_ref()
    }

    pub fn documents(&self) -> &[String] {
        &self.indexed
    }

    pub fn selection(&self) -> &ModelSelection {
        &self.active.selection
    }

    pub fn embedding_backend(&self) -> &str {
        &self.active.embedding_backend
    }

    pub fn store(&self) -> &VectorStore {
        &self.active.store
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    if text.chars().nth(max_chars).is_some() {
        out.push('…');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_defaults_to_first_catalog_model() {
        let sel = ModelSelection::resolve("Groq", None, "llama3.2").unwrap();
        assert_eq!(sel.provider, "groq");
        assert_eq!(sel.model, "llama-3.1-8b-instant");
        assert_eq!(sel.label(), "Groq");
    }

    #[test]
    fn selection_rejects_unknown_model() {
        assert!(matches!(
            ModelSelection::resolve("gemini", Some("gpt-4o"), "llama3.2"),
            Err(CatalogError::UnknownModel { .. })
        ));
    }

    #[test]
    fn local_selection_uses_configured_model() {
        let sel = ModelSelection::resolve("ollama", None, "mistral").unwrap();
        assert_eq!(sel.model, "mistral");
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        assert_eq!(preview("short", 300), "short");
        let long = "é".repeat(301);
        let p = preview(&long, 300);
        assert_eq!(p.chars().count(), 301);
        assert!(p.ends_with('…'));
    }

    #[test]
    fn api_key_override_applies_to_its_provider_only() {
        let backends = ConfiguredBackends::new(Config::default()).with_api_key("groq", "gsk-test".into());
        assert!(backends.llm("groq", "llama-3.1-8b-instant").is_ok());
        assert!(backends.llm("gemini", "gemini-1.5-flash").is_err());
    }
}
