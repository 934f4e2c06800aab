use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One answered question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub question: String,
    pub answer: String,
    /// Provider display label, e.g. `Groq`.
    pub provider: String,
    pub model: String,
    /// PDFs the answer drew on.
    pub sources: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Append-only log of turns with a pointer past the last live entry.
///
/// `undo` moves the pointer back one entry; the next `push` drops whatever
/// lies beyond the pointer. There is no redo.
#[derive(Debug, Default)]
pub struct HistoryLog {
    entries: Vec<Turn>,
    live: usize,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.entries.truncate(self.live);
        self.entries.push(turn);
        self.live = self.entries.len();
    }

    /// Retract the most recent turn. `None` on an empty log.
    pub fn undo(&mut self) -> Option<Turn> {
        if self.live == 0 {
            return None;
        }
        self.live -= 1;
        self.entries.get(self.live).cloned()
    }

    /// Live turns in chronological order.
    pub fn turns(&self) -> &[Turn] {
        &self.entries[..self.live]
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns().last()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.live = 0;
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }
}
