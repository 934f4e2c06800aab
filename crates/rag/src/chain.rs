//! One question-answer turn: embed, retrieve, prompt.

use std::fmt;

use pdfchat_ingest::embedding::{Embedder, EmbeddingError};
use pdfchat_llm::{LlmError, LlmProvider};
use thiserror::Error;
use tracing::{debug, info};

use crate::prompt::{build_messages, PromptStyle};
use crate::store::{SearchResult, StoreError, VectorStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainStage {
    Idle,
    EmbeddingQuestion,
    Retrieving,
    PromptingLlm,
    Done,
    Failed,
}

impl fmt::Display for ChainStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChainStage::Idle => "idle",
            ChainStage::EmbeddingQuestion => "embedding the question",
            ChainStage::Retrieving => "retrieving context",
            ChainStage::PromptingLlm => "prompting the LLM",
            ChainStage::Done => "done",
            ChainStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum ChainFailure {
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Llm(#[from] LlmError),
}

/// A failed turn and the stage it failed in.
#[derive(Debug, Error)]
#[error("{source} (while {stage})")]
pub struct ChainError {
    pub stage: ChainStage,
    pub source: ChainFailure,
}

#[derive(Debug, Clone)]
pub struct ChainAnswer {
    pub answer: String,
    /// Source filenames of the retrieved chunks, de-duplicated, best first.
    pub sources: Vec<String>,
    pub contexts: Vec<SearchResult>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainSettings {
    pub top_k: usize,
    pub temperature: f32,
    pub max_tokens: u32,
    pub style: PromptStyle,
}

impl Default for ChainSettings {
    fn default() -> Self {
        Self {
            top_k: 5,
            temperature: 0.7,
            max_tokens: 500,
            style: PromptStyle::Assistant,
        }
    }
}

pub struct RetrievalChain<'a> {
    embedder: &'a dyn Embedder,
    llm: &'a dyn LlmProvider,
    store: &'a VectorStore,
    settings: ChainSettings,
    stage: ChainStage,
}

impl<'a> RetrievalChain<'a> {
    pub fn new(
        embedder: &'a dyn Embedder,
        llm: &'a dyn LlmProvider,
        store: &'a VectorStore,
        settings: ChainSettings,
    ) -> Self {
        Self {
            embedder,
            llm,
            store,
            settings,
            stage: ChainStage::Idle,
        }
    }

    pub fn stage(&self) -> ChainStage {
        self.stage
    }

    fn fail(&mut self, source: impl Into<ChainFailure>) -> ChainError {
        let stage = self.stage;
        self.stage = ChainStage::Failed;
        ChainError {
            stage,
            source: source.into(),
        }
    }

    /// Answer `question` from the store. Fewer than `top_k` hits are used as
    /// they are; no hits still produces an answer from a "no context" prompt.
    pub async fn run(&mut self, question: &str) -> Result<ChainAnswer, ChainError> {
        let (embedder, llm, store) = (self.embedder, self.llm, self.store);

        self.stage = ChainStage::EmbeddingQuestion;
        let vector = embedder.embed_one(question).await;
        let vector = vector.map_err(|e| self.fail(e))?;

        self.stage = ChainStage::Retrieving;
        let contexts = store
            .query(&vector, self.settings.top_k)
            .map_err(|e| self.fail(e))?;
        debug!(hits = contexts.len(), top_k = self.settings.top_k, "Retrieved context");

        self.stage = ChainStage::PromptingLlm;
        let messages = build_messages(self.settings.style, question, &contexts);
        let answer = llm
            .complete(messages, self.settings.temperature, self.settings.max_tokens)
            .await;
        let answer = answer.map_err(|e| self.fail(e))?;

        let mut sources: Vec<String> = Vec::new();
        for hit in &contexts {
            if !sources.contains(&hit.source) {
                sources.push(hit.source.clone());
            }
        }

        self.stage = ChainStage::Done;
        info!(
            provider = llm.provider_name(),
            model = llm.model_name(),
            sources = sources.len(),
            "Answered question"
        );
        Ok(ChainAnswer {
            answer,
            sources,
            contexts,
        })
    }
}
