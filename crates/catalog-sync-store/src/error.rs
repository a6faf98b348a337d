//! Error types for the store module.

use catalog_sync_core::{PricingError, RunId};
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store belongs to a run that was cancelled; it accepts no more
    /// mutations and publishes nothing.
    #[error("catalog store for {0} is closed")]
    Closed(RunId),

    /// A merge rule could not reprice a record. Nothing was committed.
    #[error("merge failed: {0}")]
    Pricing(#[from] PricingError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
