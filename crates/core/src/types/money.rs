//! Decimal money helpers.
//!
//! Prices are plain `Decimal` amounts in the store's single currency. The
//! arithmetic here is checked: `None` means the amount does not fit in a
//! `Decimal`.

use rust_decimal::{Decimal, RoundingStrategy};

/// Price of `quantity` units at `unit_price`.
#[must_use]
pub fn line_total(unit_price: Decimal, quantity: i32) -> Option<Decimal> {
    unit_price.checked_mul(Decimal::from(quantity))
}

/// Sum of `amounts`, or `None` on overflow.
#[must_use]
pub fn sum_amounts<I>(amounts: I) -> Option<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, Decimal::checked_add)
}

/// Format an amount for display, e.g. `$12.50`.
#[must_use]
pub fn format_price(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("${rounded:.2}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_total() {
        assert_eq!(
            line_total(Decimal::new(1999, 2), 3),
            Some(Decimal::new(5997, 2))
        );
        assert_eq!(line_total(Decimal::new(500, 2), 0), Some(Decimal::ZERO));
    }

    #[test]
    fn test_line_total_overflow_is_none() {
        assert_eq!(line_total(Decimal::MAX, 2), None);
        let huge = Decimal::from_i128_with_scale(10_i128.pow(20), 0);
        assert_eq!(line_total(huge, i32::MAX), None);
    }

    #[test]
    fn test_sum_amounts() {
        assert_eq!(sum_amounts(Vec::new()), Some(Decimal::ZERO));
        assert_eq!(
            sum_amounts([Decimal::new(1050, 2), Decimal::new(399, 2)]),
            Some(Decimal::new(1449, 2))
        );
        assert_eq!(sum_amounts([Decimal::MAX, Decimal::ONE]), None);
    }

    #[test]
    fn test_format_price_pads() {
        assert_eq!(format_price(Decimal::new(125, 1)), "$12.50");
        assert_eq!(format_price(Decimal::ZERO), "$0.00");
    }

    #[test]
    fn test_format_price_rounds_half_up() {
        assert_eq!(format_price(Decimal::new(10005, 3)), "$10.01");
    }
}
