//! Unified error types for the ODL offline worker.

use tokio_rusqlite::rusqlite;

/// Unified error types shared across the worker crates.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input (e.g. an empty URL in a cache request).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Database operation failed. Storage-quota exhaustion surfaces here;
    /// request handlers treat it as non-fatal and keep the live response.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Invalid or non-cacheable URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Network-level failure (connection refused, DNS, aborted transfer).
    /// This is the condition that triggers a category's offline fallback.
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// Fetch timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// The server answered, but with a status an explicit cache request
    /// cannot accept.
    #[error("UNEXPECTED_STATUS: {0}")]
    UnexpectedStatus(u16),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// A deferred-sync flush failed; must propagate to the scheduler so the
    /// sync is re-signaled rather than silently dropped.
    #[error("SYNC_FAILED: {0}")]
    SyncFailed(String),
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
