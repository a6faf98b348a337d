//! Tax arithmetic.
//!
//! Prices are exact decimals so that repeated application and comparison
//! across runs are deterministic.

use rust_decimal::Decimal;

use crate::error::PricingError;

/// The multiplier for a tax rate given in percent: `1 + rate / 100`.
pub fn tax_multiplier(rate_percent: Decimal) -> Decimal {
    Decimal::ONE + rate_percent / Decimal::ONE_HUNDRED
}

/// Apply a percentage tax to a price.
///
/// A missing price stays missing. Fails instead of panicking when the taxed
/// price does not fit in a `Decimal`.
pub fn apply_tax(
    price: Option<Decimal>,
    rate_percent: Decimal,
) -> Result<Option<Decimal>, PricingError> {
    let Some(price) = price else {
        return Ok(None);
    };
    price
        .checked_mul(tax_multiplier(rate_percent))
        .map(Some)
        .ok_or(PricingError::Overflow {
            price,
            rate: rate_percent,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ten_percent() {
        assert_eq!(
            apply_tax(Some(Decimal::from(100)), Decimal::TEN),
            Ok(Some(Decimal::from(110)))
        );
    }

    #[test]
    fn test_fractional_rate() {
        let rate: Decimal = "12.5".parse().unwrap();
        assert_eq!(
            apply_tax(Some(Decimal::from(80)), rate),
            Ok(Some(Decimal::from(90)))
        );
    }

    #[test]
    fn test_missing_price_stays_missing() {
        assert_eq!(apply_tax(None, Decimal::TEN), Ok(None));
    }

    #[test]
    fn test_zero_rate_is_identity() {
        let price: Decimal = "19.99".parse().unwrap();
        assert_eq!(apply_tax(Some(price), Decimal::ZERO), Ok(Some(price)));
    }

    #[test]
    fn test_repeated_application_compounds() {
        let once = apply_tax(Some(Decimal::from(100)), Decimal::TEN).unwrap();
        let twice = apply_tax(once, Decimal::TEN).unwrap();
        assert_eq!(twice, Some(Decimal::from(121)));
    }

    #[test]
    fn test_overflow_is_an_error() {
        let price = Decimal::from(1_000_000_000);
        let rate: Decimal = "1000000000000000000000000".parse().unwrap();
        assert_eq!(
            apply_tax(Some(price), rate),
            Err(PricingError::Overflow { price, rate })
        );
        assert_eq!(apply_tax(None, rate), Ok(None));
    }

    proptest::proptest! {
        #[test]
        fn test_tax_is_exact(cents in 0i64..10_000_000, tenths in 0i64..1_000) {
            let price = Decimal::new(cents, 2);
            let rate = Decimal::new(tenths, 1);
            let taxed = apply_tax(Some(price), rate).unwrap().unwrap();
            proptest::prop_assert_eq!(
                taxed * Decimal::ONE_HUNDRED,
                price * (Decimal::ONE_HUNDRED + rate)
            );
        }

        #[test]
        fn test_non_negative_rate_never_lowers_price(
            cents in 0i64..10_000_000,
            tenths in 0i64..1_000,
        ) {
            let price = Decimal::new(cents, 2);
            let taxed = apply_tax(Some(price), Decimal::new(tenths, 1)).unwrap().unwrap();
            proptest::prop_assert!(taxed >= price);
        }
    }
}
