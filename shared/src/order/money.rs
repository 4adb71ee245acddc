//! Money calculation utilities using rust_decimal for precision
//!
//! All calculations are done using `Decimal` internally, then converted to `f64`
//! for storage/serialization.

use super::types::{OrderItem, Supplement};
use crate::error::{OrderError, OrderResult};
use rust_decimal::prelude::*;

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Maximum allowed price per unit or supplement
const MAX_PRICE: f64 = 1_000_000.0;
/// Maximum allowed quantity per item
const MAX_QUANTITY: u32 = 9999;

#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

fn require_price(value: f64, field_name: &str) -> OrderResult<()> {
    if !value.is_finite() {
        return Err(OrderError::InvalidOrder(format!(
            "{} must be a finite number, got {}",
            field_name, value
        )));
    }
    if value < 0.0 {
        return Err(OrderError::InvalidOrder(format!(
            "{} must be non-negative, got {}",
            field_name, value
        )));
    }
    if value > MAX_PRICE {
        return Err(OrderError::InvalidOrder(format!(
            "{} exceeds maximum allowed ({}), got {}",
            field_name, MAX_PRICE, value
        )));
    }
    Ok(())
}

/// Line total: (unit_price + Σ supplements) × quantity
pub fn line_total(unit_price: f64, supplements: &[Supplement], quantity: u32) -> OrderResult<f64> {
    require_price(unit_price, "unit price")?;
    if quantity == 0 {
        return Err(OrderError::InvalidOrder(
            "quantity must be at least 1".to_string(),
        ));
    }
    if quantity > MAX_QUANTITY {
        return Err(OrderError::InvalidOrder(format!(
            "quantity exceeds maximum allowed ({}), got {}",
            MAX_QUANTITY, quantity
        )));
    }

    let mut unit = to_decimal(unit_price);
    for s in supplements {
        require_price(s.price, "supplement price")?;
        unit += to_decimal(s.price);
    }
    Ok(to_f64(unit * Decimal::from(quantity)))
}

/// Order total: Σ item.total_price
pub fn order_total(items: &[OrderItem]) -> f64 {
    let sum: Decimal = items.iter().map(|i| to_decimal(i.total_price)).sum();
    to_f64(sum)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(total_price: f64) -> OrderItem {
        OrderItem {
            name: "x".to_string(),
            quantity: 1,
            unit_price: total_price,
            total_price,
            size: None,
            supplements: vec![],
        }
    }

    #[test]
    fn test_line_total_with_supplements() {
        let supplements = vec![
            Supplement {
                name: "cheese".to_string(),
                price: 0.5,
            },
            Supplement {
                name: "bacon".to_string(),
                price: 1.2,
            },
        ];
        assert_eq!(line_total(8.9, &supplements, 3).unwrap(), 31.8);
    }

    #[test]
    fn test_order_total_has_no_float_drift() {
        let items = vec![item(0.1), item(0.2), item(0.3)];
        assert_eq!(order_total(&items), 0.6);
    }

    #[test]
    fn test_line_total_rejects_bad_input() {
        assert!(matches!(
            line_total(5.0, &[], 0),
            Err(OrderError::InvalidOrder(_))
        ));
        assert!(line_total(-1.0, &[], 1).is_err());
        assert!(line_total(f64::NAN, &[], 1).is_err());
        let bad = vec![Supplement {
            name: "x".to_string(),
            price: f64::INFINITY,
        }];
        assert!(line_total(1.0, &bad, 1).is_err());
    }
}
