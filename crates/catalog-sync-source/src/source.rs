//! Delta source abstraction.
//!
//! The source owns transport, authentication, and transport-level retries.
//! The engine only sees six independent async operations.

use std::fmt;

use async_trait::async_trait;
use catalog_sync_core::{Decimal, Delta, DeltaKind, PriceUpdate, ProductId, Record, StockUpdate};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One of the six source operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Baseline,
    TaxRate,
    PriceUpdates,
    StockUpdates,
    Deletions,
    NewRecords,
}

impl Operation {
    /// Every operation, baseline first.
    pub const ALL: [Operation; 6] = [
        Operation::Baseline,
        Operation::TaxRate,
        Operation::PriceUpdates,
        Operation::StockUpdates,
        Operation::Deletions,
        Operation::NewRecords,
    ];

    /// Dense index in `0..6`, for per-operation tables.
    pub const fn index(self) -> usize {
        match self {
            Operation::Baseline => 0,
            Operation::TaxRate => 1,
            Operation::PriceUpdates => 2,
            Operation::StockUpdates => 3,
            Operation::Deletions => 4,
            Operation::NewRecords => 5,
        }
    }

    /// The delta kind this operation produces; `None` for the baseline.
    pub fn delta_kind(self) -> Option<DeltaKind> {
        match self {
            Operation::Baseline => None,
            Operation::TaxRate => Some(DeltaKind::TaxRate),
            Operation::PriceUpdates => Some(DeltaKind::PriceUpdates),
            Operation::StockUpdates => Some(DeltaKind::StockUpdates),
            Operation::Deletions => Some(DeltaKind::Deletions),
            Operation::NewRecords => Some(DeltaKind::NewRecords),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Baseline => "fetch_baseline",
            Operation::TaxRate => "fetch_tax_rate",
            Operation::PriceUpdates => "fetch_price_updates",
            Operation::StockUpdates => "fetch_stock_updates",
            Operation::Deletions => "fetch_deletions",
            Operation::NewRecords => "fetch_new_records",
        }
    }
}

impl From<DeltaKind> for Operation {
    fn from(kind: DeltaKind) -> Self {
        match kind {
            DeltaKind::TaxRate => Operation::TaxRate,
            DeltaKind::PriceUpdates => Operation::PriceUpdates,
            DeltaKind::StockUpdates => Operation::StockUpdates,
            DeltaKind::Deletions => Operation::Deletions,
            DeltaKind::NewRecords => Operation::NewRecords,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A remote catalog feed.
///
/// Every operation is independently asynchronous and independently
/// failable. No operation may assume another has completed first. An
/// operation returns its whole result or an error, never partial data.
///
/// Implementations must be thread-safe (Send + Sync); the engine calls the
/// five delta operations concurrently.
#[async_trait]
pub trait DeltaSource: Send + Sync {
    /// Fetch the full baseline catalog.
    async fn fetch_baseline(&self) -> Result<Vec<Record>>;

    /// Fetch the tax rate, in percent.
    async fn fetch_tax_rate(&self) -> Result<Decimal>;

    /// Fetch explicit price overrides.
    async fn fetch_price_updates(&self) -> Result<Vec<PriceUpdate>>;

    /// Fetch stock level changes.
    async fn fetch_stock_updates(&self) -> Result<Vec<StockUpdate>>;

    /// Fetch ids to delete.
    async fn fetch_deletions(&self) -> Result<Vec<ProductId>>;

    /// Fetch newly arrived records.
    async fn fetch_new_records(&self) -> Result<Vec<Record>>;
}

/// Fetch the delta of the given kind as a tagged [`Delta`].
pub async fn fetch_delta(source: &dyn DeltaSource, kind: DeltaKind) -> Result<Delta> {
    Ok(match kind {
        DeltaKind::TaxRate => Delta::TaxRate(source.fetch_tax_rate().await?),
        DeltaKind::PriceUpdates => Delta::PriceUpdates(source.fetch_price_updates().await?),
        DeltaKind::StockUpdates => Delta::StockUpdates(source.fetch_stock_updates().await?),
        DeltaKind::Deletions => Delta::Deletions(source.fetch_deletions().await?),
        DeltaKind::NewRecords => Delta::NewRecords(source.fetch_new_records().await?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_indices_dense() {
        for (i, op) in Operation::ALL.iter().enumerate() {
            assert_eq!(op.index(), i);
        }
    }

    #[test]
    fn test_delta_kind_roundtrip() {
        for kind in DeltaKind::ALL {
            assert_eq!(Operation::from(kind).delta_kind(), Some(kind));
        }
        assert_eq!(Operation::Baseline.delta_kind(), None);
    }
}
