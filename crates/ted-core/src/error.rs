use thiserror::Error;

/// Top-level error type for the ted-core crate and dependents.
#[derive(Debug, Error)]
pub enum TedError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("pooled connection error: {0}")]
    Pool(String),

    #[error("malformed notice: {0}")]
    Malformed(String),

    #[error("ambiguous parse of {raw:?}: matched {matches:?}")]
    AmbiguousParse {
        raw: String,
        matches: Vec<&'static str>,
    },

    #[error("schema error: {0}")]
    Schema(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience Result alias used across the workspace.
pub type Result<T> = std::result::Result<T, TedError>;
