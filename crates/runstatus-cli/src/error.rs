//! Error types for the CLI.

use std::path::PathBuf;

use runstatus_core::CoreError;
use thiserror::Error;

/// Errors that can occur while updating a TaskRun document.
#[derive(Debug, Error)]
pub enum CliError {
    /// Failed to read a file.
    #[error("failed to read '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write a file.
    #[error("failed to write '{}': {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A file did not hold the expected JSON.
    #[error("invalid JSON in '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The core rejected the update.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Retry requested on a run that has not finished.
    #[error("{0} has not finished, nothing to retry")]
    NotFinished(String),
}
