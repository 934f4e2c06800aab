//! Retrieval-augmented chat over uploaded PDFs.

pub mod chain;
pub mod export;
pub mod history;
pub mod index;
pub mod prompt;
pub mod session;
pub mod store;

pub use chain::{ChainAnswer, ChainError, ChainStage, RetrievalChain};
pub use history::{HistoryLog, Turn};
pub use index::{IndexReport, Indexer};
pub use session::{Backends, ChatSession, ConfiguredBackends, ModelSelection, SessionError};
pub use store::{SearchResult, VectorStore};
