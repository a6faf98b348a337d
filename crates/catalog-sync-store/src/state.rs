//! Catalog state and merge rules.
//!
//! `CatalogState` is the unguarded data: records by id, the current tax
//! rate, and the set of ids whose price was explicitly overridden. Every
//! merge rule is a method here; locking lives in [`CatalogStore`].
//!
//! [`CatalogStore`]: crate::CatalogStore

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use catalog_sync_core::{
    apply_tax, Delta, PriceUpdate, PricingError, ProductId, Record, RunId, Snapshot, SnapshotKind,
    StockUpdate,
};
use rust_decimal::Decimal;

/// What a merge rule did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Ids whose record was inserted, replaced, or removed.
    pub changed: Vec<ProductId>,
    /// Ids named by the delta that were not in the catalog.
    pub skipped: Vec<ProductId>,
}

impl MergeOutcome {
    fn touch(&mut self, id: ProductId) {
        self.changed.push(id);
    }

    fn skip(&mut self, id: ProductId) {
        self.skipped.push(id);
    }
}

/// The mutable catalog of one reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogState {
    /// Records indexed by id.
    records: BTreeMap<ProductId, Record>,
    /// Tax rate in percent, once known.
    tax_rate: Option<Decimal>,
    /// Ids whose price came from a price-update delta.
    overrides: BTreeSet<ProductId>,
}

impl CatalogState {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Merge Rules
    // ─────────────────────────────────────────────────────────────────────────

    /// Replace the whole catalog with a baseline.
    ///
    /// Clears the tax rate and every override mark. If an id repeats, the
    /// last record wins.
    pub fn load_baseline(&mut self, records: Vec<Record>) -> MergeOutcome {
        self.records.clear();
        self.overrides.clear();
        self.tax_rate = None;

        let mut outcome = MergeOutcome::default();
        for record in records {
            outcome.touch(record.id);
            self.records.insert(record.id, record);
        }
        outcome
    }

    /// Record the tax rate and reprice every record that is not overridden.
    ///
    /// Tax applies to the currently stored price, so a second tax delta
    /// compounds on the first. On overflow nothing changes, not even the
    /// recorded rate.
    pub fn apply_tax_rate(
        &mut self,
        rate_percent: Decimal,
    ) -> Result<MergeOutcome, PricingError> {
        let mut repriced = Vec::new();
        for (id, record) in &self.records {
            if self.overrides.contains(id) || record.price.is_none() {
                continue;
            }
            repriced.push((*id, apply_tax(record.price, rate_percent)?));
        }

        self.tax_rate = Some(rate_percent);
        let mut outcome = MergeOutcome::default();
        for (id, price) in repriced {
            if let Some(record) = self.records.get_mut(&id) {
                record.price = price;
            }
            outcome.touch(id);
        }
        Ok(outcome)
    }

    /// Set explicit prices and mark them as overrides.
    pub fn apply_price_updates(&mut self, updates: &[PriceUpdate]) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();
        for update in updates {
            match self.records.get(&update.id) {
                Some(existing) => {
                    let replaced = existing.with_price(Some(update.new_price));
                    self.records.insert(update.id, replaced);
                    self.overrides.insert(update.id);
                    outcome.touch(update.id);
                }
                None => outcome.skip(update.id),
            }
        }
        outcome
    }

    /// Set stock levels.
    pub fn apply_stock_updates(&mut self, updates: &[StockUpdate]) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();
        for update in updates {
            match self.records.get(&update.id) {
                Some(existing) => {
                    let replaced = existing.with_stock(Some(update.new_stock));
                    self.records.insert(update.id, replaced);
                    outcome.touch(update.id);
                }
                None => outcome.skip(update.id),
            }
        }
        outcome
    }

    /// Remove records and their override marks.
    pub fn apply_deletions(&mut self, ids: &[ProductId]) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();
        for &id in ids {
            self.overrides.remove(&id);
            match self.records.remove(&id) {
                Some(_) => outcome.touch(id),
                None => outcome.skip(id),
            }
        }
        outcome
    }

    /// Insert new records, taxing their price if the rate is already known.
    ///
    /// A colliding id is overwritten and loses its override mark: the stored
    /// price is now a taxed base price again. If taxing any record overflows,
    /// none are inserted.
    pub fn apply_new_records(
        &mut self,
        records: Vec<Record>,
    ) -> Result<MergeOutcome, PricingError> {
        let records = match self.tax_rate {
            Some(rate) => records
                .into_iter()
                .map(|mut record| {
                    record.price = apply_tax(record.price, rate)?;
                    Ok(record)
                })
                .collect::<Result<Vec<_>, PricingError>>()?,
            None => records,
        };

        let mut outcome = MergeOutcome::default();
        for record in records {
            self.overrides.remove(&record.id);
            outcome.touch(record.id);
            self.records.insert(record.id, record);
        }
        Ok(outcome)
    }

    /// Apply any delta with the matching merge rule.
    pub fn apply_delta(&mut self, delta: Delta) -> Result<MergeOutcome, PricingError> {
        match delta {
            Delta::TaxRate(rate) => self.apply_tax_rate(rate),
            Delta::PriceUpdates(updates) => Ok(self.apply_price_updates(&updates)),
            Delta::StockUpdates(updates) => Ok(self.apply_stock_updates(&updates)),
            Delta::Deletions(ids) => Ok(self.apply_deletions(&ids)),
            Delta::NewRecords(records) => self.apply_new_records(records),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Get a record by id.
    pub fn get(&self, id: ProductId) -> Option<&Record> {
        self.records.get(&id)
    }

    /// Iterate records in id order.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The tax rate, once a tax delta has been applied.
    pub fn tax_rate(&self) -> Option<Decimal> {
        self.tax_rate
    }

    /// Check if an id's price is an explicit override.
    pub fn is_overridden(&self, id: ProductId) -> bool {
        self.overrides.contains(&id)
    }

    /// All overridden ids, ascending.
    pub fn overrides(&self) -> impl Iterator<Item = ProductId> + '_ {
        self.overrides.iter().copied()
    }

    /// Check that every overridden id is present in the catalog.
    pub fn overrides_consistent(&self) -> bool {
        self.overrides.iter().all(|id| self.records.contains_key(id))
    }

    /// Freeze the current contents into a snapshot.
    pub fn snapshot(&self, run: RunId, seq: u64, kind: SnapshotKind) -> Snapshot {
        let records: Arc<[Record]> = self.records.values().cloned().collect();
        Snapshot {
            run,
            seq,
            kind,
            records,
            tax_rate: self.tax_rate,
        }
    }
}
