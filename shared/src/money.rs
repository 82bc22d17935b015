//! Fixed-point money arithmetic in integer minor units
//!
//! All monetary values in the billing domain are `i64` minor units
//! (e.g. cents, or whole dong for zero-decimal currencies). No `f64`
//! ever touches a money path. The only fractional quantity is a rate
//! (tax percent, discount percent), and those are `rust_decimal::Decimal`
//! multiplied against a minor amount and rounded half-up.

use rust_decimal::prelude::*;

/// A monetary amount in minor units.
pub type MinorUnits = i64;

/// Compute the tax amount for a subtotal at a percentage rate.
///
/// Rounds half-up (`MidpointAwayFromZero`) to the nearest minor unit,
/// so `tax_for(100_000, 10) == 10_000` and `tax_for(105, 10) == 11`.
pub fn tax_for(subtotal: MinorUnits, rate_percent: Decimal) -> MinorUnits {
    if rate_percent <= Decimal::ZERO || subtotal <= 0 {
        return 0;
    }
    (Decimal::from(subtotal) * rate_percent / Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(0)
}

/// The bill total identity: `total = subtotal + tax - discount`.
///
/// This is the single place the identity is computed; every code path
/// that recomputes a bill's totals goes through here.
pub fn bill_total(subtotal: MinorUnits, tax: MinorUnits, discount: MinorUnits) -> MinorUnits {
    subtotal + tax - discount
}

/// Change due to the customer: `max(0, paid - total)`.
pub fn change_due(paid: MinorUnits, total: MinorUnits) -> MinorUnits {
    (paid - total).max(0)
}

/// Whether two amounts agree within a tolerance (gateway reconciliation).
pub fn within_tolerance(a: MinorUnits, b: MinorUnits, tolerance: MinorUnits) -> bool {
    (a - b).abs() <= tolerance
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tax_for_flat_ten_percent() {
        assert_eq!(tax_for(100_000, Decimal::from(10)), 10_000);
    }

    #[test]
    fn tax_for_rounds_half_up() {
        // 105 * 10% = 10.5 -> 11
        assert_eq!(tax_for(105, Decimal::from(10)), 11);
        // 104 * 10% = 10.4 -> 10
        assert_eq!(tax_for(104, Decimal::from(10)), 10);
    }

    #[test]
    fn tax_for_fractional_rate() {
        // 10.5% of 200_000 = 21_000
        let rate = Decimal::new(105, 1);
        assert_eq!(tax_for(200_000, rate), 21_000);
    }

    #[test]
    fn tax_for_zero_rate_and_zero_subtotal() {
        assert_eq!(tax_for(100_000, Decimal::ZERO), 0);
        assert_eq!(tax_for(0, Decimal::from(10)), 0);
    }

    #[test]
    fn bill_total_identity() {
        assert_eq!(bill_total(100_000, 10_000, 0), 110_000);
        assert_eq!(bill_total(100_000, 10_000, 15_000), 95_000);
    }

    #[test]
    fn change_due_never_negative() {
        assert_eq!(change_due(150_000, 110_000), 40_000);
        assert_eq!(change_due(110_000, 110_000), 0);
        assert_eq!(change_due(50_000, 110_000), 0);
    }

    #[test]
    fn tolerance_is_inclusive() {
        assert!(within_tolerance(50_000, 50_000, 0));
        assert!(within_tolerance(50_000, 50_100, 100));
        assert!(!within_tolerance(50_000, 50_101, 100));
    }
}
