//! # Catalog Sync
//!
//! A concurrent delta-reconciliation engine for a catalog of records.
//!
//! ## Overview
//!
//! A remote source supplies a baseline catalog plus five independent deltas
//! (tax rate, price updates, stock updates, deletions, new records). The
//! engine:
//!
//! - **Loads** the baseline and publishes it as the `Initial` snapshot
//! - **Fans out** the five delta fetches concurrently
//! - **Serializes** their application against one guarded store
//! - **Publishes** an immutable snapshot after every application
//! - **Cancels** cleanly on retry, so stale runs never publish
//!
//! ## Key Concepts
//!
//! - **Snapshot**: Immutable. Each committed mutation yields exactly one.
//! - **Override**: A price set by a price update, exempt from tax for the run.
//! - **Run**: One baseline plus the resolution of all five deltas.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use catalog_sync::{CatalogUpdate, EngineConfig, ReconciliationEngine};
//! use catalog_sync::source::{SimulatedSource, SimulationConfig};
//!
//! async fn example() {
//!     let source = Arc::new(SimulatedSource::new(SimulationConfig::default()));
//!     let engine = ReconciliationEngine::new(source, EngineConfig::default());
//!
//!     let mut updates = engine.subscribe();
//!     let run = engine.start();
//!
//!     while let Some(update) = updates.changed().await {
//!         if let CatalogUpdate::Snapshot(snapshot) = update {
//!             println!("{:?}: {} records", snapshot.kind, snapshot.len());
//!         }
//!         if run.is_finished() {
//!             break;
//!         }
//!     }
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `catalog_sync::core` - Records, deltas, snapshots, pricing
//! - `catalog_sync::store` - The guarded catalog store and merge rules
//! - `catalog_sync::source` - The delta source trait and adapters

pub mod config;
pub mod engine;
pub mod error;
pub mod publisher;

// Re-export component crates
pub use catalog_sync_core as core;
pub use catalog_sync_source as source;
pub use catalog_sync_store as store;

// Re-export main types for convenience
pub use config::EngineConfig;
pub use engine::{DeltaFailure, ReconciliationEngine, RunHandle, RunOutcome, RunReport};
pub use error::{EngineError, Result};
pub use publisher::{CatalogUpdate, SnapshotPublisher, SnapshotSubscriber};

// Re-export commonly used core types
pub use catalog_sync_core::{
    Decimal, Delta, DeltaKind, PriceUpdate, ProductId, Record, RunId, Snapshot, SnapshotKind,
    StockUpdate,
};
pub use catalog_sync_source::{DeltaSource, SourceError};
