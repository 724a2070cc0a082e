//! Default Indian-markets fee schedule (spec §4.10): flat-or-percentage
//! brokerage, STT on the sell side, exchange transaction charges, GST on
//! brokerage+exchange, and small SEBI/stamp components.

use super::{FeeInputs, FeeSchedule};
use kernel_common::price::Px;
use kernel_common::trade::FeeBreakdown;

/// Brokerage floor per executed leg; this schedule charges whichever of the
/// floor or the percentage rate is *higher* (spec's illustrative S5 total
/// only reconciles under that reading of "min ₹20 or 0.05%" — see
/// `DESIGN.md`).
const BROKERAGE_FLOOR: f64 = 20.0;
const BROKERAGE_RATE: f64 = 0.0005;
const STT_RATE: f64 = 0.000_625;
const EXCHANGE_RATE: f64 = 0.000_53;
const GST_RATE: f64 = 0.18;
/// SEBI turnover fee: ₹10 per crore of turnover.
const SEBI_RATE: f64 = 0.000_001;
/// Stamp duty, buy side only.
const STAMP_RATE: f64 = 0.000_03;

#[derive(Debug, Clone, Copy, Default)]
pub struct IndianMarketsFeeSchedule;

impl FeeSchedule for IndianMarketsFeeSchedule {
    fn compute(&self, inputs: FeeInputs<'_>) -> FeeBreakdown {
        let _ = inputs.exchange; // single domestic schedule; venue-specific rates are a future schedule impl
        let buy_turnover = inputs.entry * f64::from(inputs.quantity);
        let sell_turnover = inputs.exit * f64::from(inputs.quantity);
        let total_turnover = buy_turnover + sell_turnover;

        let brokerage_leg = |turnover: f64| (turnover * BROKERAGE_RATE).max(BROKERAGE_FLOOR);
        let brokerage = round2(brokerage_leg(buy_turnover) + brokerage_leg(sell_turnover));

        let stt = round2(sell_turnover * STT_RATE);
        let exchange = round2(total_turnover * EXCHANGE_RATE);
        let gst = round2((brokerage + exchange) * GST_RATE);
        let sebi = round2(total_turnover * SEBI_RATE);
        let stamp = round2(buy_turnover * STAMP_RATE);

        FeeBreakdown { brokerage, stt, exchange, gst, sebi, stamp }
    }
}

fn round2(value: f64) -> f64 {
    Px::from_rupees(value).rounded_rupees()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn small_order_pays_the_brokerage_floor_on_each_leg() {
        let schedule = IndianMarketsFeeSchedule;
        let breakdown = schedule.compute(FeeInputs { entry: 100.0, exit: 110.0, quantity: 75, exchange: "NSE" });
        assert_relative_eq!(breakdown.brokerage, 40.0, epsilon = 1e-6);
    }

    #[test]
    fn large_order_pays_the_percentage_rate_instead_of_the_floor() {
        let schedule = IndianMarketsFeeSchedule;
        let breakdown = schedule.compute(FeeInputs { entry: 1000.0, exit: 1100.0, quantity: 5000, exchange: "NSE" });
        // buy turnover = 5,000,000 -> 0.05% = 2500, well above the ₹20 floor.
        assert!(breakdown.brokerage > 40.0);
    }

    #[test]
    fn stt_applies_only_to_the_sell_leg() {
        let schedule = IndianMarketsFeeSchedule;
        let breakdown = schedule.compute(FeeInputs { entry: 100.0, exit: 100.0, quantity: 75, exchange: "NSE" });
        assert_relative_eq!(breakdown.stt, 100.0 * 75.0 * STT_RATE, epsilon = 1e-2);
    }
}
