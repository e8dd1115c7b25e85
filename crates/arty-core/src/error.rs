use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by a [`HistoryStore`](crate::store::HistoryStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// Propagated from the SQLite pool.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Embedded migrations could not be applied at startup.
    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// A stored row could not be mapped back into its domain type.
    #[error("invalid {table} row {id}: {message}")]
    InvalidRow {
        table: &'static str,
        id: i64,
        message: String,
    },

    /// The store refused or could not accept the operation.
    #[error("history store unavailable: {0}")]
    Unavailable(String),
}

/// All errors that can end a generation request.
///
/// Only [`GenerationError::Selection`] (and a failed remote model lookup) can
/// happen before streaming starts; everything else is reported to the caller
/// as an `Error` event on the stream.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The requested model is not served by any configured backend.
    #[error("Selected model not available: {model}")]
    Selection { model: String },

    /// Connection refused, mid-stream disconnect, non-success status, or an
    /// engine failure reported by the backend itself.
    #[error("backend transport error: {0}")]
    Transport(String),

    /// The backend answered with a payload that could not be decoded.
    #[error("backend protocol error: {0}")]
    Protocol(String),

    /// Persistence failed after generation.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The artifact could not be written to the artifacts directory.
    #[error("failed to write artifact to {}: {source}", path.display())]
    ArtifactWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        GenerationError::Transport(e.to_string())
    }
}
