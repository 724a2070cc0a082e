//! Long-only P&L calculator (spec §4.10). Deterministic and reproducible
//! bit-for-bit given identical inputs: all arithmetic happens in [`Px`]
//! fixed-point ticks, converted to rupees only at the final rounding step.

use crate::fees::{FeeInputs, FeeSchedule};
use kernel_common::price::Px;
use kernel_common::signal::Direction;

/// `quantity` always counts units, never lots (spec §9 open question #1):
/// a position's `quantity` field is the number of option contracts' worth
/// of underlying, already a multiple of the instrument's lot size. This is
/// `lot_multiplier = 1` in the spec's terms, fixed for the whole kernel.
#[must_use]
pub fn gross_pnl(direction: Direction, entry: f64, exit: f64, quantity: u32) -> f64 {
    let entry = Px::from_rupees(entry);
    let exit = Px::from_rupees(exit);
    let qty = i64::from(quantity);

    let diff_ticks = match direction {
        Direction::Call => exit.ticks() - entry.ticks(),
        Direction::Put => entry.ticks() - exit.ticks(),
    };
    Px::from_ticks(diff_ticks * qty).rounded_rupees()
}

/// Computes gross P&L, the fee breakdown, and net P&L for a closing trade.
/// `fees` is the pluggable boundary (spec §4.10); the default
/// Indian-markets schedule lives in [`crate::fees::default_schedule`].
#[must_use]
pub fn settle(
    direction: Direction,
    entry: f64,
    exit: f64,
    quantity: u32,
    exchange: &str,
    fees: &dyn FeeSchedule,
) -> (f64, kernel_common::trade::FeeBreakdown, f64) {
    let gross = gross_pnl(direction, entry, exit, quantity);
    let breakdown = fees.compute(FeeInputs { entry, exit, quantity, exchange });
    let net = Px::from_rupees(gross - breakdown.total()).rounded_rupees();
    (gross, breakdown, net)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fees::default_schedule::IndianMarketsFeeSchedule;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn call_gross_matches_spec_s5() {
        let gross = gross_pnl(Direction::Call, 80.35, 83.40, 75);
        assert_relative_eq!(gross, 228.75, epsilon = 1e-6);
    }

    #[test]
    fn put_gross_matches_spec_s5() {
        let gross = gross_pnl(Direction::Put, 312.60, 324.75, 40);
        assert_relative_eq!(gross, -486.00, epsilon = 1e-6);
    }

    #[test]
    fn call_and_put_are_antisymmetric() {
        // spec invariant 6: pnl_call(e, x, q) = -pnl_put(x, e, q)
        let call = gross_pnl(Direction::Call, 100.0, 120.0, 75);
        let put = gross_pnl(Direction::Put, 120.0, 100.0, 75);
        assert_relative_eq!(call, -put, epsilon = 1e-6);
    }

    #[test]
    fn flat_exit_is_zero() {
        assert_relative_eq!(gross_pnl(Direction::Call, 100.0, 100.0, 75), 0.0, epsilon = 1e-9);
        assert_relative_eq!(gross_pnl(Direction::Put, 100.0, 100.0, 75), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn settle_matches_spec_s5_fee_example() {
        let schedule = IndianMarketsFeeSchedule::default();
        let (gross, breakdown, net) = settle(Direction::Call, 100.0, 110.0, 75, "NSE", &schedule);
        assert_relative_eq!(gross, 750.0, epsilon = 1e-6);
        // spec gives these as approximate ("≈ ₹62.46" / "≈ ₹687.54").
        assert_relative_eq!(breakdown.total(), 62.46, epsilon = 0.1);
        assert_relative_eq!(net, 687.54, epsilon = 0.1);
        assert_relative_eq!(net, gross - breakdown.total(), epsilon = 1e-6);
    }

    proptest! {
        #[test]
        fn antisymmetry_holds_for_arbitrary_prices(entry in 1.0..5000.0f64, exit in 1.0..5000.0f64, qty in 1u32..5000u32) {
            let call = gross_pnl(Direction::Call, entry, exit, qty);
            let put = gross_pnl(Direction::Put, exit, entry, qty);
            prop_assert!((call - put).abs() < 1e-6);
        }

        #[test]
        fn net_always_equals_gross_minus_fee_total(entry in 1.0..5000.0f64, exit in 1.0..5000.0f64, qty in 1u32..5000u32) {
            let schedule = IndianMarketsFeeSchedule::default();
            let (gross, breakdown, net) = settle(Direction::Call, entry, exit, qty, "NSE", &schedule);
            prop_assert!((net - (gross - breakdown.total())).abs() < 1e-6);
        }
    }
}
