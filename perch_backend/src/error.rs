use thiserror::Error;

/// Failure taxonomy shared by every service. The API layer maps each
/// variant onto an HTTP status, so services never reason about transport.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed or rule-breaking input (empty content, bad cursor, …).
    #[error("{0}")]
    Validation(String),
    /// Missing or unresolvable session token on an authenticated operation.
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    /// Uniqueness clash, e.g. claiming an already-taken username.
    #[error("{0}")]
    Conflict(String),
    /// Posting quota exceeded for the rolling window.
    #[error("{0}")]
    RateLimited(String),
    #[error("database failure: {0}")]
    Database(#[from] rusqlite::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}
