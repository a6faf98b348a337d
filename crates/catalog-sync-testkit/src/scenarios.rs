//! Golden scenarios for the merge rules.
//!
//! Each scenario is a baseline, a sequence of deltas applied in order, and
//! the exact catalog that must result.

use catalog_sync_core::{Decimal, Delta, PriceUpdate, ProductId, Record, StockUpdate};
use catalog_sync_store::CatalogState;

use crate::fixtures::{catalog, dec, priced, priceless, replay};

/// A golden scenario.
#[derive(Debug, Clone)]
pub struct GoldenScenario {
    /// Human-readable name for the scenario.
    pub name: &'static str,
    /// Starting catalog.
    pub baseline: Vec<Record>,
    /// Deltas, applied in this order.
    pub deltas: Vec<Delta>,
    /// Expected catalog, sorted by id.
    pub expected: Vec<Record>,
}

impl GoldenScenario {
    /// Apply the scenario's deltas to its baseline.
    pub fn replay(&self) -> CatalogState {
        replay(self.baseline.clone(), self.deltas.clone())
    }

    /// Check the replayed catalog against the expected one.
    pub fn verify(&self) -> Result<(), String> {
        let state = self.replay();
        let actual: Vec<Record> = state.records().cloned().collect();
        if actual == self.expected {
            Ok(())
        } else {
            Err(format!(
                "{}: expected {:?}, got {:?}",
                self.name, self.expected, actual
            ))
        }
    }
}

/// Get all golden scenarios.
pub fn all_scenarios() -> Vec<GoldenScenario> {
    vec![
        GoldenScenario {
            name: "tax applies to baseline",
            baseline: catalog(&[(1, 100)]),
            deltas: vec![Delta::TaxRate(Decimal::TEN)],
            expected: catalog(&[(1, 110)]),
        },
        GoldenScenario {
            name: "price override is immune to later tax",
            baseline: catalog(&[(1, 100)]),
            deltas: vec![
                Delta::TaxRate(Decimal::TEN),
                Delta::PriceUpdates(vec![PriceUpdate::new(1, Decimal::from(200))]),
                Delta::TaxRate(Decimal::from(20)),
            ],
            expected: catalog(&[(1, 200)]),
        },
        GoldenScenario {
            name: "deletion and new records",
            baseline: catalog(&[(1, 10), (2, 20)]),
            deltas: vec![
                Delta::Deletions(vec![ProductId(1)]),
                Delta::NewRecords(vec![priced(3, 30)]),
            ],
            expected: catalog(&[(2, 20), (3, 30)]),
        },
        GoldenScenario {
            name: "tax compounds on current price",
            baseline: catalog(&[(1, 100)]),
            deltas: vec![Delta::TaxRate(Decimal::TEN), Delta::TaxRate(Decimal::TEN)],
            expected: catalog(&[(1, 121)]),
        },
        GoldenScenario {
            name: "new records are taxed when the rate is known",
            baseline: catalog(&[(1, 100)]),
            deltas: vec![
                Delta::TaxRate(dec("12.5")),
                Delta::NewRecords(vec![priced(2, 80)]),
            ],
            expected: vec![priced(1, 0).price(dec("112.5")), priced(2, 90)],
        },
        GoldenScenario {
            name: "re-added id is tax-eligible again",
            baseline: catalog(&[(1, 100)]),
            deltas: vec![
                Delta::PriceUpdates(vec![PriceUpdate::new(1, Decimal::from(50))]),
                Delta::TaxRate(Decimal::TEN),
                Delta::Deletions(vec![ProductId(1)]),
                Delta::NewRecords(vec![priced(1, 100)]),
                Delta::TaxRate(Decimal::TEN),
            ],
            expected: catalog(&[(1, 121)]),
        },
        GoldenScenario {
            name: "unknown ids are skipped",
            baseline: vec![priced(1, 5).stock(1)],
            deltas: vec![
                Delta::StockUpdates(vec![StockUpdate::new(1, 5), StockUpdate::new(99, 7)]),
                Delta::PriceUpdates(vec![PriceUpdate::new(98, Decimal::ONE)]),
                Delta::Deletions(vec![ProductId(97)]),
            ],
            expected: vec![priced(1, 5).stock(5)],
        },
        GoldenScenario {
            name: "priceless records stay priceless",
            baseline: vec![priceless(1), priced(2, 10)],
            deltas: vec![Delta::TaxRate(Decimal::from(50))],
            expected: vec![priceless(1), priced(2, 15)],
        },
    ]
}

/// Verify every golden scenario, returning the failures.
pub fn verify_all_scenarios() -> Vec<String> {
    all_scenarios()
        .iter()
        .filter_map(|scenario| scenario.verify().err())
        .collect()
}
