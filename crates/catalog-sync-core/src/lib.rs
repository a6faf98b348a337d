//! # Catalog Sync Core
//!
//! Pure primitives for Catalog Sync: records, deltas, snapshots, and pricing.
//!
//! This crate contains no I/O, no locking, no async. It is pure computation
//! over catalog values.
//!
//! ## Key Types
//!
//! - [`Record`] - A catalog item
//! - [`ProductId`] - Stable record identity
//! - [`Delta`] - A fetched partial update, tagged by [`DeltaKind`]
//! - [`Snapshot`] - An immutable published view of the catalog
//!
//! ## Pricing
//!
//! Tax rates are percentages applied multiplicatively. See [`pricing`].

pub mod delta;
pub mod error;
pub mod pricing;
pub mod record;
pub mod snapshot;
pub mod types;
pub mod validation;

pub use delta::{Delta, DeltaKind, PriceUpdate, StockUpdate};
pub use error::{PricingError, ValidationError};
pub use pricing::{apply_tax, tax_multiplier};
pub use record::Record;
pub use snapshot::{Snapshot, SnapshotKind};
pub use types::{ProductId, RunId};
pub use validation::{
    validate_delta, validate_price_updates, validate_records, validate_stock_updates,
    validate_tax_rate,
};

// Re-exported so downstream crates and tests share one decimal type.
pub use rust_decimal::Decimal;
