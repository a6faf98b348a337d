//! Error types for the source module.

use std::time::Duration;

use catalog_sync_core::ValidationError;
use thiserror::Error;

use crate::source::Operation;

/// Errors that can occur while fetching from a delta source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The remote call failed.
    #[error("{operation} unavailable: {message}")]
    Unavailable { operation: Operation, message: String },

    /// The remote call did not complete in time.
    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: Operation, after: Duration },

    /// The remote call returned a payload that failed validation.
    #[error("{operation} returned an invalid payload: {source}")]
    InvalidPayload {
        operation: Operation,
        #[source]
        source: ValidationError,
    },

    /// A scripted source has no response for this operation.
    #[error("no response scripted for {operation}")]
    NotScripted { operation: Operation },

    /// A source script could not be parsed.
    #[error("invalid source script: {0}")]
    Script(#[from] serde_json::Error),
}

impl SourceError {
    /// Construct an `Unavailable` error.
    pub fn unavailable(operation: Operation, message: impl Into<String>) -> Self {
        SourceError::Unavailable {
            operation,
            message: message.into(),
        }
    }
}

/// Result type for source operations.
pub type Result<T> = std::result::Result<T, SourceError>;
