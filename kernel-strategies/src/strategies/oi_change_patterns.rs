//! Reacts to the *change* in open interest at the ATM strike between two
//! consecutive market-data refreshes, not to its level.

use crate::contract::{Strategy, StrategyContext};
use crate::strategies::support::build_signal;
use kernel_common::instrument::OptionSide;
use kernel_common::signal::{Direction, Signal};

/// Minimum relative OI build-up at a strike to treat as a pattern rather
/// than refresh noise.
const OI_CHANGE_THRESHOLD: f64 = 0.15;

pub struct OiChangePatterns;

impl Strategy for OiChangePatterns {
    fn canonical_id(&self) -> &'static str {
        "oi_change_patterns"
    }

    fn analyse(&self, ctx: &StrategyContext<'_>) -> Vec<Signal> {
        let Some(previous) = ctx.previous else {
            return Vec::new();
        };

        let strike = ctx.underlying.atm_strike;
        let Some(put_now) = ctx.underlying.option_chain.leg(strike, OptionSide::Put) else {
            return Vec::new();
        };
        let Some(call_now) = ctx.underlying.option_chain.leg(strike, OptionSide::Call) else {
            return Vec::new();
        };
        let put_before = previous.option_chain.leg(strike, OptionSide::Put);
        let call_before = previous.option_chain.leg(strike, OptionSide::Call);

        let put_change = relative_change(put_before.map(|l| l.open_interest), put_now.open_interest);
        let call_change = relative_change(call_before.map(|l| l.open_interest), call_now.open_interest);

        // Heavy put writing at ATM (OI up, price flat/down) reads bullish:
        // writers are selling puts, betting the floor holds.
        if put_change >= OI_CHANGE_THRESHOLD && put_change > call_change {
            if !call_now.is_plausible() {
                return Vec::new();
            }
            let strength = 50.0 + (put_change - OI_CHANGE_THRESHOLD) * 100.0;
            return vec![build_signal(
                self.canonical_id(),
                ctx,
                Direction::Call,
                call_now,
                strength,
                format!("ATM put OI up {:.0}% since last refresh", put_change * 100.0),
                1,
            )];
        }

        if call_change >= OI_CHANGE_THRESHOLD && call_change > put_change {
            if !put_now.is_plausible() {
                return Vec::new();
            }
            let strength = 50.0 + (call_change - OI_CHANGE_THRESHOLD) * 100.0;
            return vec![build_signal(
                self.canonical_id(),
                ctx,
                Direction::Put,
                put_now,
                strength,
                format!("ATM call OI up {:.0}% since last refresh", call_change * 100.0),
                1,
            )];
        }

        Vec::new()
    }
}

fn relative_change(before: Option<u64>, after: u64) -> f64 {
    match before {
        Some(b) if b > 0 => (after as f64 - b as f64) / b as f64,
        _ => 0.0,
    }
}
