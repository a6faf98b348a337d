//! Proptest generators for property-based testing.

use proptest::prelude::*;

use catalog_sync_core::{Decimal, Delta, DeltaKind, PriceUpdate, ProductId, Record, StockUpdate};
use catalog_sync_source::MemorySource;
use catalog_sync_store::CatalogState;

/// Ids at or above this are never present in a generated catalog.
pub const UNKNOWN_ID_BASE: i64 = 10_000;

/// Generate a price between 0.00 and 1000.00.
pub fn price() -> impl Strategy<Value = Decimal> {
    (0i64..=100_000).prop_map(|cents| Decimal::new(cents, 2))
}

/// Generate a stock level.
pub fn stock() -> impl Strategy<Value = i64> {
    0i64..=1_000
}

/// Generate a tax rate between 0.0 and 30.0 percent.
pub fn tax_rate() -> impl Strategy<Value = Decimal> {
    (0i64..=300).prop_map(|tenths| Decimal::new(tenths, 1))
}

/// Generate a record with the given id; price and stock may be absent.
pub fn record(id: i64) -> impl Strategy<Value = Record> {
    (
        "[a-z]{1,8}",
        proptest::option::weighted(0.9, price()),
        proptest::option::weighted(0.8, stock()),
    )
        .prop_map(move |(name, price, stock)| {
            let mut record = Record::new(id, name);
            record.price = price;
            record.stock = stock;
            record
        })
}

/// Generate a baseline with ids `1..=len`.
pub fn baseline(max_len: usize) -> impl Strategy<Value = Vec<Record>> {
    (1..=max_len.max(1)).prop_flat_map(|len| (1..=len as i64).map(record).collect::<Vec<_>>())
}

/// What a plan does to one baseline id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Untouched,
    Priced,
    Stocked,
    PricedAndStocked,
    Deleted,
}

fn role() -> impl Strategy<Value = Role> {
    prop_oneof![
        Just(Role::Untouched),
        Just(Role::Priced),
        Just(Role::Stocked),
        Just(Role::PricedAndStocked),
        Just(Role::Deleted),
    ]
}

/// A baseline plus one payload for each of the five deltas.
///
/// Payloads never conflict: updates target surviving baseline ids (plus some
/// unknown ids), deletions target ids no update touches, and new records use
/// fresh ids. The final catalog is therefore the same for every order in
/// which the deltas are applied.
#[derive(Debug, Clone)]
pub struct DeltaPlan {
    pub baseline: Vec<Record>,
    pub tax_rate: Decimal,
    pub price_updates: Vec<PriceUpdate>,
    pub stock_updates: Vec<StockUpdate>,
    pub deletions: Vec<ProductId>,
    pub new_records: Vec<Record>,
}

impl DeltaPlan {
    /// The delta of the given kind.
    pub fn delta(&self, kind: DeltaKind) -> Delta {
        match kind {
            DeltaKind::TaxRate => Delta::TaxRate(self.tax_rate),
            DeltaKind::PriceUpdates => Delta::PriceUpdates(self.price_updates.clone()),
            DeltaKind::StockUpdates => Delta::StockUpdates(self.stock_updates.clone()),
            DeltaKind::Deletions => Delta::Deletions(self.deletions.clone()),
            DeltaKind::NewRecords => Delta::NewRecords(self.new_records.clone()),
        }
    }

    /// Load the baseline and apply the deltas in `order`.
    pub fn replay(&self, order: &[DeltaKind]) -> CatalogState {
        let mut state = CatalogState::new();
        state.load_baseline(self.baseline.clone());
        for &kind in order {
            state
                .apply_delta(self.delta(kind))
                .expect("generated deltas reprice without overflow");
        }
        state
    }

    /// A scripted source serving this plan.
    pub fn source(&self) -> MemorySource {
        MemorySource::new()
            .baseline(self.baseline.clone())
            .tax_rate(self.tax_rate)
            .price_updates(self.price_updates.clone())
            .stock_updates(self.stock_updates.clone())
            .deletions(self.deletions.clone())
            .new_records(self.new_records.clone())
    }
}

impl Arbitrary for DeltaPlan {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        baseline(12)
            .prop_flat_map(|baseline| {
                let len = baseline.len();
                (
                    Just(baseline),
                    proptest::collection::vec((role(), price(), stock()), len),
                    tax_rate(),
                    proptest::collection::vec(UNKNOWN_ID_BASE..UNKNOWN_ID_BASE + 100, 0..3),
                    0usize..4,
                )
            })
            .prop_flat_map(|(baseline, roles, tax_rate, unknown, fresh)| {
                let next_id = baseline.len() as i64 + 1;
                let new_records = (next_id..next_id + fresh as i64)
                    .map(record)
                    .collect::<Vec<_>>();
                (
                    Just(baseline),
                    Just(roles),
                    Just(tax_rate),
                    Just(unknown),
                    new_records,
                )
            })
            .prop_map(|(baseline, roles, tax_rate, unknown, new_records)| {
                let mut plan = DeltaPlan {
                    baseline,
                    tax_rate,
                    price_updates: Vec::new(),
                    stock_updates: Vec::new(),
                    deletions: Vec::new(),
                    new_records,
                };
                for (record, (role, price, stock)) in plan.baseline.iter().zip(roles) {
                    let id = record.id;
                    match role {
                        Role::Untouched => {}
                        Role::Priced => plan.price_updates.push(PriceUpdate::new(id, price)),
                        Role::Stocked => plan.stock_updates.push(StockUpdate::new(id, stock)),
                        Role::PricedAndStocked => {
                            plan.price_updates.push(PriceUpdate::new(id, price));
                            plan.stock_updates.push(StockUpdate::new(id, stock));
                        }
                        Role::Deleted => plan.deletions.push(id),
                    }
                }
                for raw in unknown {
                    plan.price_updates.push(PriceUpdate::new(raw, Decimal::ONE));
                    plan.stock_updates.push(StockUpdate::new(raw, 1));
                    plan.deletions.push(ProductId(raw));
                }
                plan
            })
            .boxed()
    }
}

/// Every order in which the five deltas can complete (120 of them).
pub fn all_orders() -> Vec<Vec<DeltaKind>> {
    fn permute(
        prefix: &mut Vec<DeltaKind>,
        rest: &mut Vec<DeltaKind>,
        out: &mut Vec<Vec<DeltaKind>>,
    ) {
        if rest.is_empty() {
            out.push(prefix.clone());
            return;
        }
        for i in 0..rest.len() {
            let kind = rest.remove(i);
            prefix.push(kind);
            permute(prefix, rest, out);
            prefix.pop();
            rest.insert(i, kind);
        }
    }

    let mut out = Vec::with_capacity(120);
    permute(&mut Vec::new(), &mut DeltaKind::ALL.to_vec(), &mut out);
    out
}

/// Generate one completion order of the five deltas.
pub fn delta_order() -> impl Strategy<Value = Vec<DeltaKind>> {
    Just(DeltaKind::ALL.to_vec()).prop_shuffle()
}
