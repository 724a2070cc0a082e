//! Trades continuation of an opening gap: in the first hour of the
//! session, a spot reading well away from VWAP (z-score) tends to extend
//! rather than mean-revert.

use crate::contract::{Strategy, StrategyContext};
use crate::strategies::support::build_signal;
use chrono::Timelike;
use kernel_common::instrument::OptionSide;
use kernel_common::signal::{Direction, Signal};

const GAP_ZSCORE_THRESHOLD: f64 = 1.5;
const OPENING_WINDOW_END_MINUTE_OF_DAY: u32 = 10 * 60 + 15; // 10:15 IST

pub struct GapAndGo;

impl Strategy for GapAndGo {
    fn canonical_id(&self) -> &'static str {
        "gap_and_go"
    }

    fn analyse(&self, ctx: &StrategyContext<'_>) -> Vec<Signal> {
        let minute_of_day = ctx.now.hour() * 60 + ctx.now.minute();
        if minute_of_day > OPENING_WINDOW_END_MINUTE_OF_DAY {
            return Vec::new();
        }

        let Some(z) = ctx.underlying.indicators.vwap_zscore else {
            return Vec::new();
        };
        if z.abs() < GAP_ZSCORE_THRESHOLD {
            return Vec::new();
        }

        let (direction, side) = if z > 0.0 {
            (Direction::Call, OptionSide::Call)
        } else {
            (Direction::Put, OptionSide::Put)
        };

        let Some(leg) = ctx.underlying.option_chain.leg(ctx.underlying.atm_strike, side) else {
            return Vec::new();
        };
        if !leg.is_plausible() {
            return Vec::new();
        }

        let strength = 50.0 + (z.abs() - GAP_ZSCORE_THRESHOLD) * 20.0;
        vec![build_signal(
            self.canonical_id(),
            ctx,
            direction,
            leg,
            strength,
            format!("opening-range VWAP z-score {z:.2}"),
            1,
        )]
    }
}
