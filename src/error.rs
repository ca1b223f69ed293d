//! Error types for sensei-core.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or missing input. Never retried, never triggers a fallback path.
    #[error("invalid input: {0}")]
    Validation(String),

    /// A referenced project, domain, task, or canonical task does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Call-level oracle failure: timeout, transport error, error payload, or
    /// a response that does not parse as a match verdict. Recovered by the
    /// matcher's exact-name fallback.
    #[error("oracle error: {0}")]
    Oracle(String),

    /// The oracle's hosting layer cannot be reached at all. Recovered by the
    /// orchestrator's degraded direct-insert path.
    #[error("oracle unavailable: {0}")]
    OracleUnavailable(String),

    /// Data store read/write failure. Surfaced to the caller; the orphan
    /// linker catches it per instance instead of aborting the batch.
    #[error("store error: {0}")]
    Store(String),

    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("config error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Environmental failures are those the enriched creation pipeline may
    /// recover from by falling back to a degraded direct insert. Validation
    /// and store errors are not environmental.
    pub fn is_environmental(&self) -> bool {
        matches!(self, Error::OracleUnavailable(_))
    }
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        Error::Store(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Other(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
