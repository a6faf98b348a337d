//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::str::FromStr;
use std::sync::Mutex;

use catalog_sync_core::{Decimal, Delta, Record, RunId, Snapshot, SnapshotKind};
use catalog_sync_store::{CatalogState, CatalogStore};

/// Snapshots collected by a test sink, in publish order.
pub type SnapshotLog = Mutex<Vec<Snapshot>>;

/// Parse a decimal literal.
pub fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).expect("invalid decimal literal")
}

/// A record with a whole-number price.
pub fn priced(id: i64, price: i64) -> Record {
    Record::new(id, format!("item-{id}")).price(Decimal::from(price))
}

/// A record with no price.
pub fn priceless(id: i64) -> Record {
    Record::new(id, format!("item-{id}"))
}

/// Records from `(id, price)` pairs.
pub fn catalog(prices: &[(i64, i64)]) -> Vec<Record> {
    prices.iter().map(|&(id, price)| priced(id, price)).collect()
}

/// Load `baseline` and apply `deltas` in order, without locking.
pub fn replay(baseline: Vec<Record>, deltas: impl IntoIterator<Item = Delta>) -> CatalogState {
    let mut state = CatalogState::new();
    state.load_baseline(baseline);
    for delta in deltas {
        state.apply_delta(delta).expect("delta reprices without overflow");
    }
    state
}

/// A test fixture holding a store and the log its snapshots go to.
pub struct StoreFixture {
    pub store: CatalogStore,
    pub log: SnapshotLog,
}

impl StoreFixture {
    /// Create a store for the first run with `baseline` already loaded.
    pub fn new(baseline: Vec<Record>) -> Self {
        let fixture = Self {
            store: CatalogStore::new(RunId::FIRST),
            log: Mutex::new(Vec::new()),
        };
        fixture
            .store
            .apply(
                SnapshotKind::Initial,
                |state| state.load_baseline(baseline),
                &fixture.log,
            )
            .expect("fresh store is open");
        fixture
    }

    /// Apply a delta and publish its snapshot.
    pub fn apply(&self, delta: Delta) -> Snapshot {
        let kind = SnapshotKind::applied(delta.kind());
        self.store
            .try_apply(kind, |state| state.apply_delta(delta), &self.log)
            .expect("store is open and delta applies")
            .snapshot
    }

    /// Everything published so far.
    pub fn published(&self) -> Vec<Snapshot> {
        self.log.lock().expect("log lock").clone()
    }
}
