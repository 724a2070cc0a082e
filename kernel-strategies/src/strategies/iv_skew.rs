//! Compares OTM put vs OTM call implied volatility one step away from ATM.
//! A steep put-side skew (downside fear richly priced) is itself a crowded
//! trade and tends to fade; the reverse for call-side skew.

use crate::contract::{Strategy, StrategyContext};
use crate::strategies::support::build_signal;
use kernel_common::instrument::OptionSide;
use kernel_common::signal::{Direction, Signal};

const SKEW_THRESHOLD: f64 = 0.03;

pub struct IvSkew;

impl Strategy for IvSkew {
    fn canonical_id(&self) -> &'static str {
        "iv_skew"
    }

    fn analyse(&self, ctx: &StrategyContext<'_>) -> Vec<Signal> {
        let chain = &ctx.underlying.option_chain;
        let atm = ctx.underlying.atm_strike;
        let step = one_strike_step(chain, atm);
        let Some(step) = step else { return Vec::new() };

        let otm_call = chain.leg(atm + step, OptionSide::Call);
        let otm_put = chain.leg(atm - step, OptionSide::Put);
        let (Some(otm_call), Some(otm_put)) = (otm_call, otm_put) else {
            return Vec::new();
        };
        if !otm_call.is_plausible() || !otm_put.is_plausible() {
            return Vec::new();
        }

        let skew = otm_put.implied_volatility - otm_call.implied_volatility;

        let (direction, side) = if skew >= SKEW_THRESHOLD {
            (Direction::Call, OptionSide::Call)
        } else if skew <= -SKEW_THRESHOLD {
            (Direction::Put, OptionSide::Put)
        } else {
            return Vec::new();
        };

        let Some(leg) = chain.leg(atm, side) else {
            return Vec::new();
        };
        if !leg.is_plausible() {
            return Vec::new();
        }

        let strength = 50.0 + skew.abs() * 1000.0;
        vec![build_signal(
            self.canonical_id(),
            ctx,
            direction,
            leg,
            strength,
            format!("OTM skew (put IV - call IV) = {skew:.3}"),
            1,
        )]
    }
}

/// Distance to the next listed strike above `atm`, used as the one-step
/// offset for "OTM by one strike".
fn one_strike_step(chain: &kernel_common::option_chain::OptionChain, atm: f64) -> Option<f64> {
    chain
        .strikes()
        .map(|(k, _)| k)
        .filter(|&k| k > atm)
        .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|next| next - atm)
        .filter(|&s| s > 0.0)
}
