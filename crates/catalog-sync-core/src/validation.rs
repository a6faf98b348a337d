//! Payload validation: structural checks on fetched deltas.
//!
//! These run before a payload touches the store, so that a corrupt payload
//! is rejected whole instead of being half-applied.

use std::collections::HashSet;

use rust_decimal::Decimal;

use crate::delta::{Delta, PriceUpdate, StockUpdate};
use crate::error::{Result, ValidationError};
use crate::record::Record;

/// Validate a batch of records (baseline or new arrivals).
///
/// Checks:
/// - No id appears twice
/// - No negative price
/// - No negative stock
pub fn validate_records(records: &[Record]) -> Result<()> {
    let mut seen = HashSet::with_capacity(records.len());
    for record in records {
        if !seen.insert(record.id) {
            return Err(ValidationError::DuplicateId(record.id));
        }
        if let Some(price) = record.price {
            if price < Decimal::ZERO {
                return Err(ValidationError::NegativePrice {
                    id: record.id,
                    price,
                });
            }
        }
        if let Some(stock) = record.stock {
            if stock < 0 {
                return Err(ValidationError::NegativeStock {
                    id: record.id,
                    stock,
                });
            }
        }
    }
    Ok(())
}

/// Validate a tax rate. Anything at or above -100% keeps prices non-negative.
pub fn validate_tax_rate(rate_percent: Decimal) -> Result<()> {
    if rate_percent < -Decimal::ONE_HUNDRED {
        return Err(ValidationError::TaxRateOutOfRange(rate_percent));
    }
    Ok(())
}

/// Validate explicit price updates.
pub fn validate_price_updates(updates: &[PriceUpdate]) -> Result<()> {
    for update in updates {
        if update.new_price < Decimal::ZERO {
            return Err(ValidationError::NegativePrice {
                id: update.id,
                price: update.new_price,
            });
        }
    }
    Ok(())
}

/// Validate stock updates.
pub fn validate_stock_updates(updates: &[StockUpdate]) -> Result<()> {
    match updates.iter().find(|u| u.new_stock < 0) {
        Some(u) => Err(ValidationError::NegativeStock {
            id: u.id,
            stock: u.new_stock,
        }),
        None => Ok(()),
    }
}

/// Validate any delta payload.
///
/// Deletion lists are always valid: unknown or repeated ids are no-ops.
pub fn validate_delta(delta: &Delta) -> Result<()> {
    match delta {
        Delta::TaxRate(rate) => validate_tax_rate(*rate),
        Delta::PriceUpdates(updates) => validate_price_updates(updates),
        Delta::StockUpdates(updates) => validate_stock_updates(updates),
        Delta::Deletions(_) => Ok(()),
        Delta::NewRecords(records) => validate_records(records),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProductId;

    #[test]
    fn test_valid_records() {
        let records = vec![
            Record::new(1, "a").price(Decimal::from(10)).stock(0),
            Record::new(2, "b"),
        ];
        assert!(validate_records(&records).is_ok());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let records = vec![Record::new(1, "a"), Record::new(1, "b")];
        assert_eq!(
            validate_records(&records),
            Err(ValidationError::DuplicateId(ProductId(1)))
        );
    }

    #[test]
    fn test_negative_price_rejected() {
        let records = vec![Record::new(3, "a").price(Decimal::from(-1))];
        assert!(matches!(
            validate_records(&records),
            Err(ValidationError::NegativePrice { .. })
        ));

        let updates = vec![PriceUpdate::new(3, Decimal::from(-5))];
        assert!(validate_price_updates(&updates).is_err());
    }

    #[test]
    fn test_negative_stock_rejected() {
        let updates = vec![StockUpdate::new(1, 4), StockUpdate::new(2, -1)];
        assert_eq!(
            validate_stock_updates(&updates),
            Err(ValidationError::NegativeStock {
                id: ProductId(2),
                stock: -1
            })
        );
    }

    #[test]
    fn test_tax_rate_bounds() {
        assert!(validate_tax_rate(Decimal::from(-100)).is_ok());
        assert!(validate_tax_rate(Decimal::from(250)).is_ok());
        assert!(validate_tax_rate(Decimal::from(-101)).is_err());
    }

    #[test]
    fn test_deletions_always_valid() {
        let delta = Delta::Deletions(vec![ProductId(1), ProductId(1)]);
        assert!(validate_delta(&delta).is_ok());
    }
}
