#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use pdfchat_core::{Config, UploadedFile};
use pdfchat_ingest::embedding::{Embedder, EmbeddingError};
use pdfchat_llm::{LlmError, LlmProvider, Message, Role};
use pdfchat_rag::{Backends, ChatSession, ModelSelection};

const DIMS: usize = 32;

/// Build a one-page PDF showing `text` in Helvetica, with a correct xref table.
pub fn minimal_pdf(text: &str) -> Vec<u8> {
    let escaped = text.replace('\\', "\\\\").replace('(', "\\(").replace(')', "\\)");
    let content = format!("BT /F1 24 Tf 72 720 Td ({escaped}) Tj ET");
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R \
         /Resources << /Font << /F1 5 0 R >> >> >>"
            .to_string(),
        format!("<< /Length {} >>\nstream\n{}\nendstream", content.len(), content),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_string(),
    ];

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }

    let xref_at = out.len();
    let mut tail = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        tail.push_str(&format!("{offset:010} 00000 n \n"));
    }
    tail.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref_at
    ));
    out.extend_from_slice(tail.as_bytes());
    out
}

pub fn pdf_file(name: &str, text: &str) -> UploadedFile {
    UploadedFile::new(name, minimal_pdf(text))
}

// ── Fake embedder ──────────────────────────────────

/// Hashes words into a fixed number of buckets. Texts sharing words get
/// similar vectors.
pub struct BagOfWordsEmbedder {
    fail: Arc<AtomicBool>,
    non_finite: Arc<AtomicBool>,
}

fn bucket(word: &str) -> usize {
    let mut hash: u64 = 0xcbf29ce484222325;
    for b in word.bytes() {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    (hash % DIMS as u64) as usize
}

pub fn bag_of_words(text: &str) -> Vec<f32> {
    let mut v = vec![0.0; DIMS];
    for word in text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        v[bucket(word)] += 1.0;
    }
    v
}

#[async_trait]
impl Embedder for BagOfWordsEmbedder {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(EmbeddingError::Api("simulated network error".into()));
        }
        if self.non_finite.load(Ordering::SeqCst) {
            return Ok(texts.iter().map(|_| vec![f32::NAN; DIMS]).collect());
        }
        Ok(texts.iter().map(|t| bag_of_words(t)).collect())
    }

    fn dimensions(&self) -> usize {
        DIMS
    }

    fn model_id(&self) -> String {
        "test/bag-of-words".into()
    }
}

// ── Fake LLM ───────────────────────────────────────

/// Answers "The sky is blue." when the prompt's context mentions blue.
pub struct ScriptedLlm {
    provider: String,
    model: String,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn complete(&self, messages: Vec<Message>, _: f32, _: u32) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let system = messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        if system.contains("blue") {
            Ok("The sky is blue.".to_string())
        } else {
            Ok("The documents do not say.".to_string())
        }
    }

    fn provider_name(&self) -> &str {
        &self.provider
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ── Backends ───────────────────────────────────────

#[derive(Clone, Default)]
pub struct FakeBackends {
    pub embed_fail: Arc<AtomicBool>,
    /// Makes the embedder return NaN vectors.
    pub embed_non_finite: Arc<AtomicBool>,
    pub llm_calls: Arc<AtomicUsize>,
}

impl Backends for FakeBackends {
    fn llm(&self, provider: &str, model: &str) -> Result<Box<dyn LlmProvider>, LlmError> {
        Ok(Box::new(ScriptedLlm {
            provider: provider.to_string(),
            model: model.to_string(),
            calls: Arc::clone(&self.llm_calls),
        }))
    }

    fn embedder(&self, _llm_provider: &str) -> Result<Arc<dyn Embedder>, EmbeddingError> {
        Ok(Arc::new(BagOfWordsEmbedder {
            fail: Arc::clone(&self.embed_fail),
            non_finite: Arc::clone(&self.embed_non_finite),
        }))
    }
}

pub struct Harness {
    pub session: ChatSession,
    pub backends: FakeBackends,
    pub dir: tempfile::TempDir,
}

pub fn test_config(dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.vector_store.dir = dir.to_path_buf();
    config
}

pub fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    start(config, dir)
}

pub const CORPUS_SOURCE: &str = "platon.json";

/// Harness whose config points at a base corpus file holding `corpus_json`.
pub fn harness_with_corpus(corpus_json: &str) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(CORPUS_SOURCE);
    std::fs::write(&path, corpus_json).unwrap();
    let mut config = test_config(dir.path());
    config.vector_store.base_corpus_path = Some(path);
    start(config, dir)
}

fn start(config: Config, dir: tempfile::TempDir) -> Harness {
    let backends = FakeBackends::default();
    let selection = ModelSelection::resolve("groq", None, "llama3.2").unwrap();
    let session = ChatSession::new(config, Box::new(backends.clone()), selection).unwrap();
    Harness {
        session,
        backends,
        dir,
    }
}
