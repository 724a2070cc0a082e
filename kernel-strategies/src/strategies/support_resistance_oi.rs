//! Derives support (max put OI strike) and resistance (max call OI strike)
//! levels and trades a bounce when spot is near either.

use crate::contract::{Strategy, StrategyContext};
use crate::strategies::support::build_signal;
use kernel_common::instrument::OptionSide;
use kernel_common::signal::{Direction, Signal};

/// Spot must be within this fraction of the level to count as "near".
const PROXIMITY_FRACTION: f64 = 0.005;

pub struct SupportResistanceOi;

impl Strategy for SupportResistanceOi {
    fn canonical_id(&self) -> &'static str {
        "support_resistance_oi"
    }

    fn analyse(&self, ctx: &StrategyContext<'_>) -> Vec<Signal> {
        let chain = &ctx.underlying.option_chain;
        let spot = ctx.underlying.spot;
        if spot <= 0.0 {
            return Vec::new();
        }

        let support = chain
            .strikes()
            .filter_map(|(k, row)| row.put.as_ref().map(|l| (k, l.open_interest)))
            .max_by_key(|&(_, oi)| oi)
            .map(|(k, _)| k);
        let resistance = chain
            .strikes()
            .filter_map(|(k, row)| row.call.as_ref().map(|l| (k, l.open_interest)))
            .max_by_key(|&(_, oi)| oi)
            .map(|(k, _)| k);

        if let Some(support) = support {
            if ((spot - support) / spot).abs() <= PROXIMITY_FRACTION {
                if let Some(leg) = chain.leg(ctx.underlying.atm_strike, OptionSide::Call) {
                    if leg.is_plausible() {
                        return vec![build_signal(
                            self.canonical_id(),
                            ctx,
                            Direction::Call,
                            leg,
                            65.0,
                            format!("spot {spot:.1} testing OI support at {support:.0}"),
                            1,
                        )];
                    }
                }
            }
        }

        if let Some(resistance) = resistance {
            if ((resistance - spot) / spot).abs() <= PROXIMITY_FRACTION {
                if let Some(leg) = chain.leg(ctx.underlying.atm_strike, OptionSide::Put) {
                    if leg.is_plausible() {
                        return vec![build_signal(
                            self.canonical_id(),
                            ctx,
                            Direction::Put,
                            leg,
                            65.0,
                            format!("spot {spot:.1} testing OI resistance at {resistance:.0}"),
                            1,
                        )];
                    }
                }
            }
        }

        Vec::new()
    }
}
