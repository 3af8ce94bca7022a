//! Unified error types for gazette.

use tokio_rusqlite::rusqlite;

/// Unified error types for the gazette content layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport-level failure: DNS, connect, timeout, non-success status.
    #[error("network failure: {0}")]
    Network(String),

    /// Malformed remote payload or schema mismatch.
    #[error("malformed document: {0}")]
    Decode(String),

    /// No connectivity and no usable cached copy.
    #[error("unavailable: no connectivity and no cached copy")]
    Unavailable,

    /// Identifier not present in the index or any cached document.
    #[error("not found: {0}")]
    NotFound(String),

    /// Cooperative cancellation of an in-flight search. Not a failure.
    #[error("canceled")]
    Canceled,

    /// Database operation failed.
    #[error("database error: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("migration failed: {0}")]
    Migration(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Decode(err.to_string())
    }
}
