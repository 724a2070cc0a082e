//! PCR (put/call OI ratio) mean-reversion: a chain skewed heavily toward
//! one side's open interest tends to resolve against the crowd.

use crate::contract::{Strategy, StrategyContext};
use crate::strategies::support::build_signal;
use kernel_common::instrument::OptionSide;
use kernel_common::signal::{Direction, Signal};

const BULLISH_PCR: f64 = 1.3;
const BEARISH_PCR: f64 = 0.7;

pub struct PcrAnalysis;

impl Strategy for PcrAnalysis {
    fn canonical_id(&self) -> &'static str {
        "pcr_analysis"
    }

    fn analyse(&self, ctx: &StrategyContext<'_>) -> Vec<Signal> {
        let pcr = ctx.underlying.option_chain.aggregates(ctx.underlying.spot).pcr;
        let (direction, side, deviation) = if pcr >= BULLISH_PCR {
            (Direction::Call, OptionSide::Call, pcr - BULLISH_PCR)
        } else if pcr <= BEARISH_PCR && pcr > 0.0 {
            (Direction::Put, OptionSide::Put, BEARISH_PCR - pcr)
        } else {
            return Vec::new();
        };

        let Some(leg) = ctx.underlying.option_chain.leg(ctx.underlying.atm_strike, side) else {
            return Vec::new();
        };
        if !leg.is_plausible() {
            return Vec::new();
        }

        let strength = 50.0 + deviation * 80.0;
        vec![build_signal(
            self.canonical_id(),
            ctx,
            direction,
            leg,
            strength,
            format!("PCR {pcr:.2} skewed, expecting mean reversion"),
            1,
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::test_support::{fixture_snapshot, leg};
    use kernel_common::instrument::OptionSide;

    #[test]
    fn high_pcr_yields_bullish_call_signal() {
        let (snapshot, underlying, now) = fixture_snapshot(|chain, now| {
            chain.insert_leg(leg(25000.0, OptionSide::Call, 100.0, 10_000, now));
            chain.insert_leg(leg(25000.0, OptionSide::Put, 90.0, 20_000, now));
        });
        let ctx = StrategyContext {
            snapshot: &snapshot,
            underlying: &underlying,
            underlying_symbol: "NIFTY",
            previous: None,
            now,
        };
        let signals = PcrAnalysis.analyse(&ctx);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].direction, Direction::Call);
    }
}
