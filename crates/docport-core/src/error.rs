//! Error taxonomy shared by every store and the query engine.
//!
//! | Variant | Meaning | HTTP |
//! |---------|---------|------|
//! | [`DocError::NotFound`] | unknown document id | 404 |
//! | [`DocError::Validation`] | missing or malformed caller input | 400 |
//! | [`DocError::Store`] | persistence or I/O failure | 500 |
//!
//! Nothing in the core retries. Errors surface to the caller immediately.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocError {
    #[error("document not found: {0}")]
    NotFound(String),

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("store failure: {0:#}")]
    Store(#[from] anyhow::Error),
}

pub type DocResult<T> = Result<T, DocError>;

impl DocError {
    pub fn not_found(id: impl Into<String>) -> Self {
        DocError::NotFound(id.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        DocError::Validation(message.into())
    }

    /// Wraps any error as a persistence failure.
    pub fn store<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        DocError::Store(anyhow::Error::new(err))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DocError::NotFound(_))
    }
}
