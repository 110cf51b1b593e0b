//! Run-level and per-item error types for the downloader.

use garmin_connect_client::GarminError;
use thiserror::Error;

/// Failures that end a run before any file is written.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("could not open Garmin Connect session: {0}")]
    Session(#[source] GarminError),

    #[error("could not list activities: {0}")]
    Enumeration(#[source] GarminError),
}

/// Why a single activity was not downloaded. Never aborts the run.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FailureReason {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("write error: {0}")]
    Write(String),
}

impl From<GarminError> for FailureReason {
    fn from(err: GarminError) -> Self {
        match err {
            GarminError::NotFound(body) => FailureReason::NotFound(body),
            other => FailureReason::Transport(other.to_string()),
        }
    }
}

/// Result type alias for run-level operations.
pub type DownloadResult<T> = Result<T, DownloadError>;
