//! Shared signal-construction helpers used by several strategies.

use crate::contract::StrategyContext;
use kernel_common::instrument::OptionSide;
use kernel_common::option_chain::OptionLeg;
use kernel_common::signal::{Direction, MarketContext, Signal};

/// Standard long-option reward/risk envelope: 50% favourable, 30% adverse,
/// used as the default when a strategy has no finer-grained view of its own.
/// Direction-aware per spec §3 invariant 3: a CALL's target sits above entry
/// and its stop below; a PUT is the mirror image (target below entry, stop
/// above), matching `kernel-portfolio::tracker`'s `reached_winning_side`/
/// `reached_losing_side` convention.
#[must_use]
pub fn default_target_stop(direction: Direction, entry_price: f64) -> (f64, f64) {
    match direction {
        Direction::Call => (entry_price * 1.5, entry_price * 0.7),
        Direction::Put => (entry_price * 0.7, entry_price * 1.5),
    }
}

pub fn direction_side(direction: Direction) -> OptionSide {
    match direction {
        Direction::Call => OptionSide::Call,
        Direction::Put => OptionSide::Put,
    }
}

#[must_use]
pub fn market_context(ctx: &StrategyContext<'_>) -> MarketContext {
    MarketContext {
        spot: ctx.underlying.spot,
        iv: ctx
            .underlying
            .option_chain
            .leg(ctx.underlying.atm_strike, OptionSide::Call)
            .map_or(0.0, |l| l.implied_volatility),
        vix: ctx.snapshot.vix,
        pcr: ctx.underlying.option_chain.aggregates(ctx.underlying.spot).pcr,
    }
}

#[allow(clippy::too_many_arguments)]
#[must_use]
pub fn build_signal(
    strategy_id: &str,
    ctx: &StrategyContext<'_>,
    direction: Direction,
    leg: &OptionLeg,
    strength: f64,
    reason: String,
    supporting_factors: u32,
) -> Signal {
    let (target, stop) = default_target_stop(direction, leg.ltp);
    Signal {
        strategy_id: strategy_id.to_string(),
        symbol: ctx.underlying_symbol.to_string(),
        direction,
        strike: leg.strike,
        expiry: ctx.underlying.current_weekly_expiry,
        entry_price: leg.ltp,
        target_price: target,
        stop_loss: stop,
        ladder: None,
        strength: strength.clamp(0.0, 100.0),
        reason,
        greeks: leg.greeks,
        market_context: market_context(ctx),
        produced_at: ctx.now.with_timezone(&chrono::Utc),
        supporting_factors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::test_support::{fixture_snapshot, leg as test_leg};
    use kernel_common::instrument::OptionSide;

    #[test]
    fn call_target_above_entry_stop_below() {
        let (target, stop) = default_target_stop(Direction::Call, 100.0);
        assert!(stop < 100.0 && 100.0 < target, "CALL must have stop < entry < target");
    }

    #[test]
    fn put_target_below_entry_stop_above() {
        // spec §3 invariant 3: PUT is the mirror of CALL, target < entry < stop.
        let (target, stop) = default_target_stop(Direction::Put, 100.0);
        assert!(target < 100.0 && 100.0 < stop, "PUT must have target < entry < stop");
    }

    #[test]
    fn build_signal_honours_direction_for_put() {
        let (snapshot, underlying, now) = fixture_snapshot(|chain, now| {
            chain.insert_leg(test_leg(25000.0, OptionSide::Put, 100.0, 10_000, now));
        });
        let ctx = StrategyContext {
            snapshot: &snapshot,
            underlying: &underlying,
            underlying_symbol: "NIFTY",
            previous: None,
            now,
        };
        let leg = ctx.underlying.option_chain.leg(25000.0, OptionSide::Put).unwrap();
        let signal = build_signal("test_strategy", &ctx, Direction::Put, leg, 80.0, "test".to_string(), 1);

        assert_eq!(signal.entry_price, 100.0);
        assert!(
            signal.target_price < signal.entry_price && signal.entry_price < signal.stop_loss,
            "PUT signal must satisfy target < entry < stop"
        );
    }

    #[test]
    fn build_signal_honours_direction_for_call() {
        let (snapshot, underlying, now) = fixture_snapshot(|chain, now| {
            chain.insert_leg(test_leg(25000.0, OptionSide::Call, 100.0, 10_000, now));
        });
        let ctx = StrategyContext {
            snapshot: &snapshot,
            underlying: &underlying,
            underlying_symbol: "NIFTY",
            previous: None,
            now,
        };
        let leg = ctx.underlying.option_chain.leg(25000.0, OptionSide::Call).unwrap();
        let signal = build_signal("test_strategy", &ctx, Direction::Call, leg, 80.0, "test".to_string(), 1);

        assert_eq!(signal.entry_price, 100.0);
        assert!(
            signal.stop_loss < signal.entry_price && signal.entry_price < signal.target_price,
            "CALL signal must satisfy stop < entry < target"
        );
    }
}
