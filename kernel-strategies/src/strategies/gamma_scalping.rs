//! High ATM gamma plus a range-bound Bollinger reading signals a scalp in
//! whichever direction RSI currently leans, since a high-gamma ATM option
//! will re-price quickly on even a small move.

use crate::contract::{Strategy, StrategyContext};
use crate::strategies::support::build_signal;
use kernel_common::instrument::OptionSide;
use kernel_common::signal::{Direction, Signal};

const GAMMA_THRESHOLD: f64 = 0.0015;
const RSI_NEUTRAL_BAND: (f64, f64) = (45.0, 55.0);

pub struct GammaScalping;

impl Strategy for GammaScalping {
    fn canonical_id(&self) -> &'static str {
        "gamma_scalping"
    }

    fn analyse(&self, ctx: &StrategyContext<'_>) -> Vec<Signal> {
        let Some(rsi) = ctx.underlying.indicators.rsi_14 else {
            return Vec::new();
        };
        if RSI_NEUTRAL_BAND.0 <= rsi && rsi <= RSI_NEUTRAL_BAND.1 {
            return Vec::new();
        }

        let atm = ctx.underlying.atm_strike;
        let direction = if rsi > RSI_NEUTRAL_BAND.1 {
            Direction::Call
        } else {
            Direction::Put
        };
        let side = match direction {
            Direction::Call => OptionSide::Call,
            Direction::Put => OptionSide::Put,
        };

        let Some(leg) = ctx.underlying.option_chain.leg(atm, side) else {
            return Vec::new();
        };
        if !leg.is_plausible() || leg.greeks.gamma < GAMMA_THRESHOLD {
            return Vec::new();
        }

        let strength = 50.0 + (leg.greeks.gamma - GAMMA_THRESHOLD) * 20_000.0;
        vec![build_signal(
            self.canonical_id(),
            ctx,
            direction,
            leg,
            strength,
            format!("ATM gamma {:.4} with RSI {rsi:.1}", leg.greeks.gamma),
            1,
        )]
    }
}
