//! Compares traded volume between the ATM call and put as a proxy for
//! order flow; the heavier side is where demand is currently concentrated.

use crate::contract::{Strategy, StrategyContext};
use crate::strategies::support::build_signal;
use kernel_common::instrument::OptionSide;
use kernel_common::signal::{Direction, Signal};

const IMBALANCE_RATIO_THRESHOLD: f64 = 1.5;

pub struct OrderFlowImbalance;

impl Strategy for OrderFlowImbalance {
    fn canonical_id(&self) -> &'static str {
        "order_flow_imbalance"
    }

    fn analyse(&self, ctx: &StrategyContext<'_>) -> Vec<Signal> {
        let atm = ctx.underlying.atm_strike;
        let chain = &ctx.underlying.option_chain;
        let (Some(call), Some(put)) = (chain.leg(atm, OptionSide::Call), chain.leg(atm, OptionSide::Put)) else {
            return Vec::new();
        };
        if !call.is_plausible() || !put.is_plausible() {
            return Vec::new();
        }
        if call.volume == 0 || put.volume == 0 {
            return Vec::new();
        }

        let ratio = call.volume as f64 / put.volume as f64;
        let (direction, leg, imbalance) = if ratio >= IMBALANCE_RATIO_THRESHOLD {
            (Direction::Call, call, ratio)
        } else if ratio <= 1.0 / IMBALANCE_RATIO_THRESHOLD {
            (Direction::Put, put, 1.0 / ratio)
        } else {
            return Vec::new();
        };

        let strength = 50.0 + (imbalance - IMBALANCE_RATIO_THRESHOLD) * 20.0;
        vec![build_signal(
            self.canonical_id(),
            ctx,
            direction,
            leg,
            strength,
            format!("ATM call/put volume ratio {ratio:.2}"),
            1,
        )]
    }
}
