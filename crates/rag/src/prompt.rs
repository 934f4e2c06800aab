//! Prompt assembly for one question.

use std::fmt;
use std::str::FromStr;

use pdfchat_llm::Message;

use crate::store::SearchResult;

/// Placed between retrieved chunks in the context block.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Context block used when retrieval finds nothing.
pub const NO_CONTEXT: &str = "No relevant context found in the uploaded documents.";

const ASSISTANT_SYSTEM_PROMPT: &str = "\
You are a helpful assistant answering questions about the user's PDF documents.

Use only the excerpts below to answer. If they do not contain the answer, say \
that the documents do not cover it instead of guessing. Keep answers concise \
and mention which document an answer comes from when it matters.

## EXCERPTS:
{context}";

const SOCRATIC_SYSTEM_PROMPT: &str = "\
You are Socrates, the Athenian philosopher, helping the user think through \
their PDF documents.

## YOUR METHOD:
1. Examine the premises: point out hidden assumptions in the question.
2. Raise productive perplexity: show tensions using the excerpts.
3. Guide with two or three questions that lead towards the answer.
4. Only then offer a short synthesis, citing the excerpts it rests on.

## EXCERPTS:
{context}

## RULES:
- At most 200 words per response.
- Ask more than you assert.
- If the excerpts do not help, say so and reason from the question itself.";

/// Tone of the system instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptStyle {
    #[default]
    Assistant,
    Socratic,
}

impl PromptStyle {
    fn template(&self) -> &'static str {
        match self {
            PromptStyle::Assistant => ASSISTANT_SYSTEM_PROMPT,
            PromptStyle::Socratic => SOCRATIC_SYSTEM_PROMPT,
        }
    }
}

impl FromStr for PromptStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "assistant" => Ok(PromptStyle::Assistant),
            "socratic" => Ok(PromptStyle::Socratic),
            other => Err(format!("unknown prompt style '{other}'")),
        }
    }
}

impl fmt::Display for PromptStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptStyle::Assistant => write!(f, "assistant"),
            PromptStyle::Socratic => write!(f, "socratic"),
        }
    }
}

// ── Question kinds ─────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionKind {
    Definition,
    Ethical,
    Metaphysical,
    General,
}

const DEFINITION_CUES: &[&str] = &[
    "what is", "what are", "define", "definition", "meaning of", "concept of",
    "qué es", "que es", "definición", "definicion", "concepto de",
];
const ETHICAL_CUES: &[&str] = &[
    "should", "ought", "right", "wrong", "good", "bad", "just", "fair",
    "debo", "debería", "deberia", "correcto", "bueno", "malo", "justo",
];
const METAPHYSICAL_CUES: &[&str] = &[
    "exist", "exists", "reality", "being", "essence", "form", "forms", "idea",
    "existe", "realidad", "ser", "esencia", "forma", "formas",
];

impl QuestionKind {
    /// Classify a question from keyword cues, checked in the order
    /// definition, ethical, metaphysical. Cues match whole words.
    pub fn detect(question: &str) -> Self {
        let lowered = question.to_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        let padded = format!(" {} ", words.join(" "));

        let matches = |cues: &[&str]| cues.iter().any(|cue| padded.contains(&format!(" {cue} ")));

        if matches(DEFINITION_CUES) {
            QuestionKind::Definition
        } else if matches(ETHICAL_CUES) {
            QuestionKind::Ethical
        } else if matches(METAPHYSICAL_CUES) {
            QuestionKind::Metaphysical
        } else {
            QuestionKind::General
        }
    }

    fn guidance(&self) -> Option<&'static str> {
        match self {
            QuestionKind::Definition => Some(
                "The user asks for a definition. Start from concrete examples in the \
                 excerpts, then state what they have in common.",
            ),
            QuestionKind::Ethical => Some(
                "The user raises an ethical question. Name the values in tension and \
                 show how the excerpts weigh them.",
            ),
            QuestionKind::Metaphysical => Some(
                "The user asks about existence or the nature of things. Separate what \
                 the excerpts describe as appearance from what they treat as real.",
            ),
            QuestionKind::General => None,
        }
    }
}

// ── Assembly ───────────────────────────────────────

/// Join retrieved chunks into the context block, best match first.
pub fn format_context(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return NO_CONTEXT.to_string();
    }
    results
        .iter()
        .map(|r| match r.page_number {
            Some(page) => format!("[{}, page {}]\n{}", r.source, page, r.content),
            None => format!("[{}]\n{}", r.source, r.content),
        })
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

/// System instruction for a style and question, with the context filled in.
pub fn system_prompt(style: PromptStyle, kind: QuestionKind, context: &str) -> String {
    let mut prompt = style.template().replace("{context}", context);
    if let Some(guidance) = kind.guidance() {
        prompt.push_str("\n\n## THIS QUESTION:\n");
        prompt.push_str(guidance);
    }
    prompt
}

/// Messages sent to the LLM for one question.
pub fn build_messages(style: PromptStyle, question: &str, results: &[SearchResult]) -> Vec<Message> {
    let context = format_context(results);
    let kind = QuestionKind::detect(question);
    vec![
        Message::system(system_prompt(style, kind, &context)),
        Message::user(question),
    ]
}
