//! Applies a single push-channel [`Tick`] to the market-state cache (spec
//! §4.3 "push ticks update LTP/bid/ask in place between REST refreshes").
//! Ticks for an instrument key the cache doesn't yet know about (a contract
//! the refresher hasn't discovered, or one it has rolled off) are dropped —
//! the next REST refresh is authoritative for the chain's universe.

use crate::broker::Tick;
use crate::cache::MarketStateCache;
use kernel_common::option_chain::OptionLeg;
use std::sync::Arc;
use tracing::debug;

/// Applies `tick` to `cache` by copy-on-write: clone the current snapshot,
/// mutate the one leg the tick addresses, swap the clone in. Returns `true`
/// if the tick matched a known leg and was applied.
pub fn apply_tick(cache: &MarketStateCache, tick: &Tick) -> bool {
    let Some(underlying_symbol) = cache.underlying_for(&tick.instrument_key) else {
        debug!(instrument_key = %tick.instrument_key, "tick for unknown instrument, dropped");
        return false;
    };

    let snapshot = cache.load();
    let Some(existing) = snapshot.get(&underlying_symbol) else {
        return false;
    };

    let Some((strike, side, leg)) = find_leg(existing, &tick.instrument_key) else {
        return false;
    };

    let mut updated_leg: OptionLeg = leg.clone();
    updated_leg.ltp = tick.ltp;
    if let Some(bid) = tick.bid {
        updated_leg.bid = bid;
    }
    if let Some(ask) = tick.ask {
        updated_leg.ask = ask;
    }
    if let Some(oi) = tick.open_interest {
        updated_leg.open_interest = oi;
    }
    if let Some(volume) = tick.volume {
        updated_leg.volume = volume;
    }
    updated_leg.last_updated = tick.last_trade_time;

    let mut next_snapshot = (*snapshot).clone();
    if let Some(next_underlying) = next_snapshot.underlyings.get_mut(&underlying_symbol) {
        next_underlying.option_chain.insert_leg(updated_leg);
        next_underlying.last_refresh = tick.last_trade_time.max(next_underlying.last_refresh);
        let _ = strike;
        let _ = side;
    }

    cache.swap(Arc::new(next_snapshot));
    true
}

fn find_leg<'a>(
    snapshot: &'a kernel_common::snapshot::UnderlyingSnapshot,
    instrument_key: &kernel_common::instrument::InstrumentKey,
) -> Option<(f64, kernel_common::instrument::OptionSide, &'a OptionLeg)> {
    for (strike, row) in snapshot.option_chain.strikes() {
        if let Some(call) = &row.call {
            if &call.instrument_key == instrument_key {
                return Some((strike, kernel_common::instrument::OptionSide::Call, call));
            }
        }
        if let Some(put) = &row.put {
            if &put.instrument_key == instrument_key {
                return Some((strike, kernel_common::instrument::OptionSide::Put, put));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kernel_common::greeks::Greeks;
    use kernel_common::instrument::{InstrumentKey, OptionSide};
    use kernel_common::option_chain::OptionChain;
    use kernel_common::snapshot::{MarketSnapshot, TechnicalIndicators, UnderlyingSnapshot};

    fn leg(key: &str, ltp: f64, now: chrono::DateTime<Utc>) -> OptionLeg {
        OptionLeg {
            strike: 25000.0,
            side: OptionSide::Call,
            ltp,
            bid: ltp - 1.0,
            ask: ltp + 1.0,
            open_interest: 100,
            volume: 10,
            implied_volatility: 0.15,
            greeks: Greeks::zero(),
            instrument_key: InstrumentKey::new(key),
            last_updated: now,
        }
    }

    fn seeded_cache(now: chrono::DateTime<Utc>) -> MarketStateCache {
        let mut chain = OptionChain::new("NIFTY", now, now);
        chain.insert_leg(leg("NIFTY-25000-CE", 120.0, now));

        let underlying = UnderlyingSnapshot {
            spot: 25010.0,
            atm_strike: 25000.0,
            current_weekly_expiry: now,
            option_chain: chain,
            indicators: TechnicalIndicators::default(),
            last_refresh: now,
        };

        let mut snapshot = MarketSnapshot::empty(now);
        snapshot.underlyings.insert("NIFTY".to_string(), underlying);

        let cache = MarketStateCache::new();
        cache.swap(Arc::new(snapshot));
        cache.reindex("NIFTY", vec![InstrumentKey::new("NIFTY-25000-CE")]);
        cache
    }

    #[test]
    fn tick_for_known_instrument_updates_ltp() {
        let now = Utc::now();
        let cache = seeded_cache(now);

        let tick = Tick {
            instrument_key: InstrumentKey::new("NIFTY-25000-CE"),
            ltp: 135.5,
            last_trade_time: now,
            bid: Some(135.0),
            ask: Some(136.0),
            open_interest: Some(150),
            volume: Some(20),
        };

        assert!(apply_tick(&cache, &tick));

        let snapshot = cache.load();
        let leg = snapshot
            .get("NIFTY")
            .unwrap()
            .option_chain
            .leg(25000.0, OptionSide::Call)
            .unwrap();
        assert!((leg.ltp - 135.5).abs() < 1e-9);
        assert_eq!(leg.open_interest, 150);
    }

    #[test]
    fn tick_for_unknown_instrument_is_dropped() {
        let now = Utc::now();
        let cache = seeded_cache(now);

        let tick = Tick {
            instrument_key: InstrumentKey::new("NIFTY-99999-CE"),
            ltp: 1.0,
            last_trade_time: now,
            bid: None,
            ask: None,
            open_interest: None,
            volume: None,
        };

        assert!(!apply_tick(&cache, &tick));
    }
}
