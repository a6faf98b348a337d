//! Record: the value type for a single catalog item.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::ProductId;

/// A catalog item.
///
/// Records are plain values. The store never mutates a record that has been
/// handed out in a snapshot; updates replace the record with a modified copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Stable identity.
    pub id: ProductId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Current price, if the item is priced.
    #[serde(default)]
    pub price: Option<Decimal>,
    /// Units in stock, if tracked.
    #[serde(default)]
    pub stock: Option<i64>,
}

impl Record {
    /// Create a record with the given id and name and no price or stock.
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            price: None,
            stock: None,
        }
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the price.
    pub fn price(mut self, price: Decimal) -> Self {
        self.price = Some(price);
        self
    }

    /// Set the stock level.
    pub fn stock(mut self, stock: i64) -> Self {
        self.stock = Some(stock);
        self
    }

    /// A copy of this record with a different price.
    pub fn with_price(&self, price: Option<Decimal>) -> Self {
        Self {
            price,
            ..self.clone()
        }
    }

    /// A copy of this record with a different stock level.
    pub fn with_stock(&self, stock: Option<i64>) -> Self {
        Self {
            stock,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let record = Record::new(7, "lamp")
            .description("desk lamp")
            .price(Decimal::from(25))
            .stock(3);

        assert_eq!(record.id, ProductId(7));
        assert_eq!(record.description, "desk lamp");
        assert_eq!(record.price, Some(Decimal::from(25)));
        assert_eq!(record.stock, Some(3));
    }

    #[test]
    fn test_with_price_leaves_original_untouched() {
        let original = Record::new(1, "a").price(Decimal::from(10));
        let updated = original.with_price(Some(Decimal::from(12)));

        assert_eq!(original.price, Some(Decimal::from(10)));
        assert_eq!(updated.price, Some(Decimal::from(12)));
        assert_eq!(updated.id, original.id);
    }

    #[test]
    fn test_deserialize_sparse_record() {
        let record: Record = serde_json::from_str(r#"{"id": 5, "price": "9.99"}"#).unwrap();
        assert_eq!(record.id, ProductId(5));
        assert_eq!(record.name, "");
        assert_eq!(record.price, Some("9.99".parse().unwrap()));
        assert_eq!(record.stock, None);
    }
}
