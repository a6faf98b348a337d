//! Deltas: independently-sourced partial updates to the catalog.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::record::Record;
use crate::types::ProductId;

/// An explicit price for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceUpdate {
    pub id: ProductId,
    pub new_price: Decimal,
}

impl PriceUpdate {
    pub fn new(id: impl Into<ProductId>, new_price: Decimal) -> Self {
        Self {
            id: id.into(),
            new_price,
        }
    }
}

impl From<(i64, Decimal)> for PriceUpdate {
    fn from((id, new_price): (i64, Decimal)) -> Self {
        Self::new(id, new_price)
    }
}

/// A new stock level for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockUpdate {
    pub id: ProductId,
    pub new_stock: i64,
}

impl StockUpdate {
    pub fn new(id: impl Into<ProductId>, new_stock: i64) -> Self {
        Self {
            id: id.into(),
            new_stock,
        }
    }
}

impl From<(i64, i64)> for StockUpdate {
    fn from((id, new_stock): (i64, i64)) -> Self {
        Self::new(id, new_stock)
    }
}

/// Discriminator for the five delta classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaKind {
    TaxRate,
    PriceUpdates,
    StockUpdates,
    Deletions,
    NewRecords,
}

impl DeltaKind {
    /// Every delta kind, in launch order.
    pub const ALL: [DeltaKind; 5] = [
        DeltaKind::TaxRate,
        DeltaKind::PriceUpdates,
        DeltaKind::StockUpdates,
        DeltaKind::Deletions,
        DeltaKind::NewRecords,
    ];

    /// Short stable name, used in logs and error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            DeltaKind::TaxRate => "tax_rate",
            DeltaKind::PriceUpdates => "price_updates",
            DeltaKind::StockUpdates => "stock_updates",
            DeltaKind::Deletions => "deletions",
            DeltaKind::NewRecords => "new_records",
        }
    }
}

impl fmt::Display for DeltaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fetched delta payload, ready to be merged into the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delta {
    /// Tax percentage to apply to every non-overridden price.
    TaxRate(Decimal),
    /// Explicit prices; each becomes a sticky override.
    PriceUpdates(Vec<PriceUpdate>),
    /// New stock levels.
    StockUpdates(Vec<StockUpdate>),
    /// Ids to remove.
    Deletions(Vec<ProductId>),
    /// Records to insert (overwriting on id collision).
    NewRecords(Vec<Record>),
}

impl Delta {
    /// The kind of this delta.
    pub fn kind(&self) -> DeltaKind {
        match self {
            Delta::TaxRate(_) => DeltaKind::TaxRate,
            Delta::PriceUpdates(_) => DeltaKind::PriceUpdates,
            Delta::StockUpdates(_) => DeltaKind::StockUpdates,
            Delta::Deletions(_) => DeltaKind::Deletions,
            Delta::NewRecords(_) => DeltaKind::NewRecords,
        }
    }
}
