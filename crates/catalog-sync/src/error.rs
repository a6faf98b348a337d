//! Error types for the engine.

use catalog_sync_core::RunId;
use catalog_sync_source::SourceError;
use catalog_sync_store::StoreError;
use thiserror::Error;

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Storage error, such as a merge that could not reprice a record.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Source error, including payloads that failed validation.
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// Configuration parsed but holds an unusable value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The run was cancelled by `retry`, `start`, or `shutdown`.
    #[error("{0} was cancelled")]
    Cancelled(RunId),

    /// The run driver panicked.
    #[error("{run} panicked: {message}")]
    RunPanicked { run: RunId, message: String },
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
