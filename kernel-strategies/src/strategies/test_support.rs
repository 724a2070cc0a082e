//! Fixture builders shared by the individual strategy unit tests.
#![cfg(test)]

use chrono::{TimeZone, Utc};
use kernel_common::greeks::Greeks;
use kernel_common::instrument::{InstrumentKey, OptionSide};
use kernel_common::option_chain::{OptionChain, OptionLeg};
use kernel_common::snapshot::{MarketSnapshot, TechnicalIndicators, UnderlyingSnapshot};

pub fn leg(strike: f64, side: OptionSide, ltp: f64, oi: u64, now: chrono::DateTime<Utc>) -> OptionLeg {
    OptionLeg {
        strike,
        side,
        ltp,
        bid: ltp - 0.5,
        ask: ltp + 0.5,
        open_interest: oi,
        volume: 1_000,
        implied_volatility: 0.15,
        greeks: Greeks {
            delta: 0.5,
            gamma: 0.001,
            theta: -2.0,
            vega: 5.0,
        },
        instrument_key: InstrumentKey::new(format!("{strike}{side}")),
        last_updated: now,
    }
}

/// Builds a one-underlying snapshot (spot pinned at 25000, ATM at 25000)
/// with the chain populated by `populate`. Returns the snapshot pair plus
/// the IST instant strategies should treat as "now".
pub fn fixture_snapshot(
    populate: impl FnOnce(&mut OptionChain, chrono::DateTime<Utc>),
) -> (MarketSnapshot, UnderlyingSnapshot, chrono::DateTime<chrono_tz::Tz>) {
    let now = Utc.with_ymd_and_hms(2026, 7, 28, 10, 0, 0).unwrap();
    let mut chain = OptionChain::new("NIFTY", now, now);
    populate(&mut chain, now);

    let underlying = UnderlyingSnapshot {
        spot: 25000.0,
        atm_strike: 25000.0,
        current_weekly_expiry: now,
        option_chain: chain,
        indicators: TechnicalIndicators::default(),
        last_refresh: now,
    };

    let mut snapshot = MarketSnapshot::empty(now);
    snapshot.vix = 14.0;
    snapshot.underlyings.insert("NIFTY".to_string(), underlying.clone());

    let now_ist = now.with_timezone(&chrono_tz::Asia::Kolkata);
    (snapshot, underlying, now_ist)
}
