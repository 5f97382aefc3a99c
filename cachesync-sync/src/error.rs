//! Error types for cachesync-sync.

use std::path::PathBuf;

use thiserror::Error;

use cachesync_core::{ConfigError, RecordCode};

use crate::retry::{RetryError, Retryable};
use crate::row::Position;

/// Failures of the record search service (or of a note lookup on it).
#[derive(Debug, Error)]
pub enum FetchError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The record export could not be decoded.
    #[error("record JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The search service rejected or failed the request.
    #[error("search service error: {0}")]
    Service(String),

    /// The record advertises a note but none could be retrieved.
    #[error("no note available for {code}")]
    NoteUnavailable { code: RecordCode },
}

/// Failures of the tabular store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The remote answered with an HTTP error status.
    #[error("store returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The sheet document could not be decoded or encoded.
    #[error("sheet JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The named tab does not exist.
    #[error("sheet not found: {name}")]
    TargetNotFound { name: String },

    /// An update aimed at the header row or past the last row.
    #[error("row position {position} is not a data row (sheet has {rows} rows)")]
    InvalidPosition { position: Position, rows: usize },
}

impl Retryable for StoreError {
    /// 429 is explicit throttling; 403 is what the quota limiter returns when
    /// the per-minute write budget is spent.
    fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Http { status: 429 | 403, .. })
    }
}

/// All errors that abort a reconciliation run.
///
/// Batch write failures do not appear here; they are recorded in the run's
/// report and the run carries on.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The record search failed; nothing was written.
    #[error("fetch failed: {0}")]
    Fetch(#[source] FetchError),

    /// Preparing or reading the store target failed before any write.
    #[error("store unavailable: {0}")]
    Store(#[from] RetryError<StoreError>),

    /// An error from the configuration layer.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Convenience constructor for [`FetchError::Io`].
pub(crate) fn fetch_io_err(path: impl Into<PathBuf>, source: std::io::Error) -> FetchError {
    FetchError::Io {
        path: path.into(),
        source,
    }
}

/// Convenience constructor for [`StoreError::Io`].
pub(crate) fn store_io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.into(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throttling_statuses_are_retryable() {
        for status in [429, 403] {
            let err = StoreError::Http {
                status,
                message: "slow down".to_string(),
            };
            assert!(err.is_retryable(), "{status} should be retryable");
        }
    }

    #[test]
    fn other_errors_are_not_retryable() {
        let bad_request = StoreError::Http {
            status: 400,
            message: "bad range".to_string(),
        };
        assert!(!bad_request.is_retryable());
        assert!(!StoreError::TargetNotFound {
            name: "Queensland".to_string()
        }
        .is_retryable());
    }
}
