use thiserror::Error;

/// Invalid settings detected while validating a [`crate::Config`].
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("CHUNK_SIZE must be greater than zero")]
    ZeroChunkSize,

    #[error("CHUNK_OVERLAP ({overlap}) must be smaller than CHUNK_SIZE ({size})")]
    OverlapTooLarge { size: usize, overlap: usize },

    #[error("TOP_K_RESULTS must be greater than zero")]
    ZeroTopK,

    #[error("EMBEDDING_BATCH_SIZE must be greater than zero")]
    ZeroBatchSize,

    #[error("unknown {key} value: '{value}'")]
    UnknownValue { key: &'static str, value: String },
}
