//! # Catalog Sync Testkit
//!
//! Testing utilities for Catalog Sync.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden scenarios**: Known delta sequences with their exact resulting catalogs
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: Helpers for setting up stores and catalogs
//!
//! ## Golden Scenarios
//!
//! ```rust
//! use catalog_sync_testkit::scenarios::all_scenarios;
//!
//! for scenario in all_scenarios() {
//!     assert!(scenario.verify().is_ok(), "{}", scenario.name);
//! }
//! ```
//!
//! ## Property Testing
//!
//! A [`DeltaPlan`] is a baseline with five non-conflicting deltas; replaying
//! it in any order must yield the same catalog:
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use catalog_sync_testkit::generators::{all_orders, DeltaPlan};
//!
//! proptest! {
//!     #[test]
//!     fn converges(plan: DeltaPlan) {
//!         let expected = plan.replay(&catalog_sync_core::DeltaKind::ALL);
//!         for order in all_orders() {
//!             prop_assert_eq!(plan.replay(&order), expected.clone());
//!         }
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use catalog_sync_core::{Decimal, Delta};
//! use catalog_sync_testkit::fixtures::{catalog, StoreFixture};
//!
//! let fixture = StoreFixture::new(catalog(&[(1, 100)]));
//! let snapshot = fixture.apply(Delta::TaxRate(Decimal::TEN));
//! assert_eq!(snapshot.seq, 2);
//! ```

pub mod fixtures;
pub mod generators;
pub mod scenarios;

pub use fixtures::{catalog, dec, priced, priceless, replay, SnapshotLog, StoreFixture};
pub use generators::{all_orders, delta_order, DeltaPlan};
pub use scenarios::{all_scenarios, verify_all_scenarios, GoldenScenario};
