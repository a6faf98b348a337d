//! Snapshot: an immutable point-in-time view of the catalog.

use rust_decimal::Decimal;
use std::sync::Arc;

use crate::delta::DeltaKind;
use crate::record::Record;
use crate::types::{ProductId, RunId};

/// What caused a snapshot to be published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotKind {
    /// The baseline catalog was loaded.
    Initial,
    /// Prices changed, through a tax delta or a price-update delta.
    PricesUpdated,
    /// Stock levels changed.
    StocksUpdated,
    /// Records were deleted.
    ProductsDeleted,
    /// New records were inserted.
    NewRecordsAdded,
    /// A delta could not be fetched or validated; records are unchanged.
    DeltaFailed { delta: DeltaKind, message: String },
}

impl SnapshotKind {
    /// The snapshot kind published after a delta of `kind` is applied.
    pub fn applied(kind: DeltaKind) -> Self {
        match kind {
            DeltaKind::TaxRate | DeltaKind::PriceUpdates => SnapshotKind::PricesUpdated,
            DeltaKind::StockUpdates => SnapshotKind::StocksUpdated,
            DeltaKind::Deletions => SnapshotKind::ProductsDeleted,
            DeltaKind::NewRecords => SnapshotKind::NewRecordsAdded,
        }
    }

    /// Check if this snapshot reports a failed delta.
    pub fn is_failure(&self) -> bool {
        matches!(self, SnapshotKind::DeltaFailed { .. })
    }
}

/// An immutable view of the catalog as of one publication.
///
/// Records are sorted by ascending id. Cloning a snapshot is cheap: the
/// record slice is shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// The run that produced this snapshot.
    pub run: RunId,
    /// Publication counter within the run, starting at 1 for `Initial`.
    pub seq: u64,
    /// What caused this publication.
    pub kind: SnapshotKind,
    /// Catalog contents, sorted by id.
    pub records: Arc<[Record]>,
    /// Tax rate known at publication time.
    pub tax_rate: Option<Decimal>,
}

impl Snapshot {
    /// Look up a record by id.
    pub fn get(&self, id: ProductId) -> Option<&Record> {
        self.records
            .binary_search_by_key(&id, |r| r.id)
            .ok()
            .map(|idx| &self.records[idx])
    }

    /// Check if a record with this id is present.
    pub fn contains(&self, id: ProductId) -> bool {
        self.get(id).is_some()
    }

    /// Ids of all records, ascending.
    pub fn ids(&self) -> Vec<ProductId> {
        self.records.iter().map(|r| r.id).collect()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(ids: &[i64]) -> Snapshot {
        Snapshot {
            run: RunId::FIRST,
            seq: 1,
            kind: SnapshotKind::Initial,
            records: ids.iter().map(|&id| Record::new(id, "x")).collect(),
            tax_rate: None,
        }
    }

    #[test]
    fn test_lookup() {
        let snap = snapshot(&[1, 4, 9]);
        assert!(snap.contains(ProductId(4)));
        assert!(!snap.contains(ProductId(5)));
        assert_eq!(snap.get(ProductId(9)).map(|r| r.id), Some(ProductId(9)));
        assert_eq!(snap.ids(), vec![ProductId(1), ProductId(4), ProductId(9)]);
    }

    #[test]
    fn test_applied_kinds() {
        assert_eq!(
            SnapshotKind::applied(DeltaKind::TaxRate),
            SnapshotKind::PricesUpdated
        );
        assert_eq!(
            SnapshotKind::applied(DeltaKind::Deletions),
            SnapshotKind::ProductsDeleted
        );
        assert!(!SnapshotKind::Initial.is_failure());
    }

    #[test]
    fn test_clone_shares_records() {
        let snap = snapshot(&[1, 2]);
        let copy = snap.clone();
        assert!(Arc::ptr_eq(&snap.records, &copy.records));
    }
}
