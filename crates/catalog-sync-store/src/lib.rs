//! # Catalog Sync Store
//!
//! The shared, mutation-guarded catalog of one reconciliation run.
//!
//! ## Overview
//!
//! The store keeps a map of id → record, the current tax rate, and the set
//! of ids whose price was explicitly overridden. Every change goes through
//! [`CatalogStore::apply`] or [`CatalogStore::try_apply`], which runs one
//! mutation under an exclusive lock, freezes the result into an immutable
//! [`Snapshot`], and hands it to a [`SnapshotSink`] before releasing the lock.
//!
//! ## Key Types
//!
//! - [`CatalogState`] - The unguarded catalog data and its merge rules
//! - [`CatalogStore`] - The lock-guarded store, one per run
//! - [`SnapshotSink`] - Where committed snapshots are published
//! - [`MergeOutcome`] - Which ids a merge rule changed or skipped
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Mutex;
//! use catalog_sync_core::{Decimal, Record, RunId, SnapshotKind};
//! use catalog_sync_store::CatalogStore;
//!
//! let published = Mutex::new(Vec::new());
//! let store = CatalogStore::new(RunId::FIRST);
//!
//! store
//!     .apply(
//!         SnapshotKind::Initial,
//!         |state| state.load_baseline(vec![Record::new(1, "lamp").price(Decimal::from(100))]),
//!         &published,
//!     )
//!     .unwrap();
//!
//! store
//!     .try_apply(
//!         SnapshotKind::PricesUpdated,
//!         |state| state.apply_tax_rate(Decimal::TEN),
//!         &published,
//!     )
//!     .unwrap();
//!
//! assert_eq!(published.lock().unwrap().len(), 2);
//! ```
//!
//! ## Design Notes
//!
//! - **Serialized commits**: publish order equals mutation order
//! - **Sticky overrides**: explicit prices are immune to tax until deleted
//! - **Unknown ids**: skipped and reported, never an error
//! - **Closing**: a closed store rejects all further mutations
//! - **Failed merges**: a mutation that errors commits and publishes nothing
//!
//! [`Snapshot`]: catalog_sync_core::Snapshot

pub mod error;
pub mod memory;
pub mod state;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::{Applied, CatalogStore};
pub use state::{CatalogState, MergeOutcome};
pub use traits::SnapshotSink;
