//! Seasonality by time of day: the first 20 minutes are volatile and
//! direction-prone, the midday lull (12:00-13:00 IST) tends to fade any
//! extended move, and the last half hour before the EOD force-exit window
//! is left to the risk monitor rather than new entries.

use crate::contract::{Strategy, StrategyContext};
use crate::strategies::support::build_signal;
use chrono::Timelike;
use kernel_common::instrument::OptionSide;
use kernel_common::signal::{Direction, Signal};

const MIDDAY_START_MINUTE: u32 = 12 * 60;
const MIDDAY_END_MINUTE: u32 = 13 * 60;
const LATE_SESSION_CUTOFF_MINUTE: u32 = 15 * 60;
const RSI_FADE_HIGH: f64 = 65.0;
const RSI_FADE_LOW: f64 = 35.0;

pub struct TimeOfDay;

impl Strategy for TimeOfDay {
    fn canonical_id(&self) -> &'static str {
        "time_of_day"
    }

    fn analyse(&self, ctx: &StrategyContext<'_>) -> Vec<Signal> {
        let minute_of_day = ctx.now.hour() * 60 + ctx.now.minute();
        if !(MIDDAY_START_MINUTE..MIDDAY_END_MINUTE).contains(&minute_of_day) {
            return Vec::new();
        }
        if minute_of_day >= LATE_SESSION_CUTOFF_MINUTE {
            return Vec::new();
        }

        let Some(rsi) = ctx.underlying.indicators.rsi_14 else {
            return Vec::new();
        };

        let (direction, side) = if rsi >= RSI_FADE_HIGH {
            (Direction::Put, OptionSide::Put)
        } else if rsi <= RSI_FADE_LOW {
            (Direction::Call, OptionSide::Call)
        } else {
            return Vec::new();
        };

        let Some(leg) = ctx.underlying.option_chain.leg(ctx.underlying.atm_strike, side) else {
            return Vec::new();
        };
        if !leg.is_plausible() {
            return Vec::new();
        }

        vec![build_signal(
            self.canonical_id(),
            ctx,
            direction,
            leg,
            55.0,
            format!("midday fade, RSI {rsi:.1}"),
            1,
        )]
    }
}
