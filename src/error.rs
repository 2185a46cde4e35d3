use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("vector index not built yet; run `semdex build` first")]
    IndexNotReady,

    #[error("id map has no entry for index position {position}")]
    IdMapMismatch { position: usize },

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("query must be non-empty")]
    EmptyQuery,

    #[error("embedding provider error: {0}")]
    Embedding(String),

    #[error("data directory does not exist and could not be created: {0}")]
    DataDir(PathBuf),
}
