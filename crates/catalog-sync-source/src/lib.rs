//! # Catalog Sync Source
//!
//! The boundary to the remote catalog feed.
//!
//! ## Overview
//!
//! A [`DeltaSource`] exposes six independent async operations: the baseline
//! catalog and five deltas (tax rate, price updates, stock updates,
//! deletions, new records). Each may fail on its own and none may be assumed
//! to finish before another.
//!
//! ## Adapters
//!
//! - [`MemorySource`] - Scripted responses, delays, failures, and gates for
//!   tests; loadable from JSON
//! - [`SimulatedSource`] - Seeded random catalog with random latency and
//!   failures, for demos and soak runs
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use catalog_sync_core::{Decimal, Record};
//! use catalog_sync_source::{DeltaSource, MemorySource};
//!
//! async fn example() {
//!     let source: Arc<dyn DeltaSource> = Arc::new(
//!         MemorySource::new()
//!             .baseline(vec![Record::new(1, "lamp").price(Decimal::from(100))])
//!             .tax_rate(Decimal::TEN),
//!     );
//!
//!     let baseline = source.fetch_baseline().await.unwrap();
//!     assert_eq!(baseline.len(), 1);
//! }
//! ```

pub mod error;
pub mod memory;
pub mod simulated;
pub mod source;

pub use error::{Result, SourceError};
pub use memory::{MemorySource, ScriptStep, SourceScript};
pub use simulated::{SimulatedSource, SimulationConfig};
pub use source::{fetch_delta, DeltaSource, Operation};
