//! Spot tends to drift toward the max-pain strike as expiry nears; trade
//! the direction of that pull when the gap is wide enough to matter.

use crate::contract::{Strategy, StrategyContext};
use crate::strategies::support::build_signal;
use kernel_common::instrument::OptionSide;
use kernel_common::signal::{Direction, Signal};

/// Minimum distance (as a fraction of spot) between spot and max pain
/// before the pull is worth trading.
const MIN_GAP_FRACTION: f64 = 0.003;

pub struct MaxPain;

impl Strategy for MaxPain {
    fn canonical_id(&self) -> &'static str {
        "max_pain"
    }

    fn analyse(&self, ctx: &StrategyContext<'_>) -> Vec<Signal> {
        let spot = ctx.underlying.spot;
        if spot <= 0.0 {
            return Vec::new();
        }
        let max_pain = ctx.underlying.option_chain.max_pain_strike();
        let gap = (max_pain - spot) / spot;

        let (direction, side) = if gap >= MIN_GAP_FRACTION {
            (Direction::Call, OptionSide::Call)
        } else if gap <= -MIN_GAP_FRACTION {
            (Direction::Put, OptionSide::Put)
        } else {
            return Vec::new();
        };

        let Some(leg) = ctx.underlying.option_chain.leg(ctx.underlying.atm_strike, side) else {
            return Vec::new();
        };
        if !leg.is_plausible() {
            return Vec::new();
        }

        let strength = 50.0 + gap.abs() * 3000.0;
        vec![build_signal(
            self.canonical_id(),
            ctx,
            direction,
            leg,
            strength,
            format!("spot {spot:.1} vs max pain {max_pain:.1}"),
            1,
        )]
    }
}
