use thiserror::Error;

pub type PacerResult<T> = Result<T, PacerError>;

#[derive(Error, Debug)]
pub enum PacerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Counter store error: {0}")]
    Store(String),

    #[error("Relational store error: {0}")]
    RelationalStore(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
