//! Error types for Catalog Sync Core.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::ProductId;

/// Validation errors for fetched payloads.
///
/// A payload that fails validation is rejected as a whole; the engine never
/// applies part of it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("tax rate {0}% would make prices negative")]
    TaxRateOutOfRange(Decimal),

    #[error("negative price {price} for product {id}")]
    NegativePrice { id: ProductId, price: Decimal },

    #[error("negative stock {stock} for product {id}")]
    NegativeStock { id: ProductId, stock: i64 },

    #[error("product {0} appears more than once in the batch")]
    DuplicateId(ProductId),
}

/// Result type for validation.
pub type Result<T> = std::result::Result<T, ValidationError>;

/// Arithmetic errors from repricing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("applying {rate}% tax to {price} overflows")]
    Overflow { price: Decimal, rate: Decimal },
}
