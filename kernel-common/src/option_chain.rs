//! Option chain and its derived aggregates (spec §3, §4.3).

use crate::greeks::Greeks;
use crate::instrument::{InstrumentKey, OptionSide};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One leg (call or put) at a given strike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionLeg {
    pub strike: f64,
    pub side: OptionSide,
    pub ltp: f64,
    pub bid: f64,
    pub ask: f64,
    pub open_interest: u64,
    pub volume: u64,
    pub implied_volatility: f64,
    pub greeks: Greeks,
    pub instrument_key: InstrumentKey,
    pub last_updated: DateTime<Utc>,
}

impl OptionLeg {
    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>, threshold: std::time::Duration) -> bool {
        match (now - self.last_updated).to_std() {
            Ok(age) => age > threshold,
            Err(_) => false,
        }
    }

    /// Data-quality check (spec §7): a non-positive LTP is not a valid quote.
    #[must_use]
    pub fn is_plausible(&self) -> bool {
        self.ltp > 0.0 && self.bid >= 0.0 && self.ask >= 0.0 && self.strike > 0.0
    }
}

/// Both legs available at a strike; either side may be absent briefly during
/// a partial chain refresh.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrikeRow {
    pub call: Option<OptionLeg>,
    pub put: Option<OptionLeg>,
}

/// Round a strike to the nearest paise so it can key a `BTreeMap` exactly.
fn strike_key(strike: f64) -> i64 {
    (strike * 100.0).round() as i64
}

/// A full option chain for one underlying + expiry, plus its derived
/// aggregates. Replaces the prior value atomically on each refresh (spec
/// §4.3); never mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionChain {
    pub underlying: String,
    pub expiry: DateTime<Utc>,
    strikes: BTreeMap<i64, StrikeRow>,
    pub last_refresh: DateTime<Utc>,
}

/// Derived, read-only aggregates over a chain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChainAggregates {
    pub total_call_oi: u64,
    pub total_put_oi: u64,
    pub pcr: f64,
    pub max_pain_strike: f64,
    pub atm_strike: f64,
}

impl OptionChain {
    #[must_use]
    pub fn new(underlying: impl Into<String>, expiry: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            underlying: underlying.into(),
            expiry,
            strikes: BTreeMap::new(),
            last_refresh: now,
        }
    }

    pub fn insert_leg(&mut self, leg: OptionLeg) {
        let key = strike_key(leg.strike);
        let row = self.strikes.entry(key).or_default();
        match leg.side {
            OptionSide::Call => row.call = Some(leg),
            OptionSide::Put => row.put = Some(leg),
        }
    }

    #[must_use]
    pub fn strikes(&self) -> impl Iterator<Item = (f64, &StrikeRow)> {
        self.strikes.iter().map(|(k, row)| (*k as f64 / 100.0, row))
    }

    #[must_use]
    pub fn leg(&self, strike: f64, side: OptionSide) -> Option<&OptionLeg> {
        let row = self.strikes.get(&strike_key(strike))?;
        match side {
            OptionSide::Call => row.call.as_ref(),
            OptionSide::Put => row.put.as_ref(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strikes.is_empty()
    }

    /// Nearest listed strike to spot (spec GLOSSARY: ATM strike).
    #[must_use]
    pub fn atm_strike(&self, spot: f64) -> f64 {
        self.strikes
            .keys()
            .map(|&k| k as f64 / 100.0)
            .min_by(|a, b| {
                (a - spot)
                    .abs()
                    .partial_cmp(&(b - spot).abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(spot)
    }

    /// Max pain: the strike minimising aggregate option-writer payout at
    /// hypothetical expiry (spec §4.3, GLOSSARY).
    ///
    /// `sum_K max(spot-K,0)*call_oi + max(K-spot,0)*put_oi`, minimised over
    /// candidate strikes K taken from the listed strikes themselves.
    #[must_use]
    pub fn max_pain_strike(&self) -> f64 {
        let candidates: Vec<(f64, u64, u64)> = self
            .strikes
            .iter()
            .map(|(&k, row)| {
                let strike = k as f64 / 100.0;
                let call_oi = row.call.as_ref().map_or(0, |l| l.open_interest);
                let put_oi = row.put.as_ref().map_or(0, |l| l.open_interest);
                (strike, call_oi, put_oi)
            })
            .collect();

        if candidates.is_empty() {
            return 0.0;
        }

        candidates
            .iter()
            .map(|&(hypothetical_expiry, _, _)| {
                let payout: f64 = candidates
                    .iter()
                    .map(|&(k, call_oi, put_oi)| {
                        (hypothetical_expiry - k).max(0.0) * call_oi as f64
                            + (k - hypothetical_expiry).max(0.0) * put_oi as f64
                    })
                    .sum();
                (hypothetical_expiry, payout)
            })
            .min_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(strike, _)| strike)
            .unwrap_or(0.0)
    }

    #[must_use]
    pub fn aggregates(&self, spot: f64) -> ChainAggregates {
        let total_call_oi: u64 = self
            .strikes
            .values()
            .filter_map(|r| r.call.as_ref())
            .map(|l| l.open_interest)
            .sum();
        let total_put_oi: u64 = self
            .strikes
            .values()
            .filter_map(|r| r.put.as_ref())
            .map(|l| l.open_interest)
            .sum();
        let pcr = if total_call_oi == 0 {
            0.0
        } else {
            total_put_oi as f64 / total_call_oi as f64
        };

        ChainAggregates {
            total_call_oi,
            total_put_oi,
            pcr,
            max_pain_strike: self.max_pain_strike(),
            atm_strike: self.atm_strike(spot),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leg(strike: f64, side: OptionSide, oi: u64, now: DateTime<Utc>) -> OptionLeg {
        OptionLeg {
            strike,
            side,
            ltp: 100.0,
            bid: 99.0,
            ask: 101.0,
            open_interest: oi,
            volume: 0,
            implied_volatility: 0.15,
            greeks: Greeks::zero(),
            instrument_key: InstrumentKey::new(format!("{strike}{side}")),
            last_updated: now,
        }
    }

    #[test]
    fn max_pain_picks_strike_minimising_writer_payout() {
        let now = Utc::now();
        let mut chain = OptionChain::new("NIFTY", now, now);
        // Heavy call OI at 24900 and heavy put OI at 25100 should pull max
        // pain toward the strike where both sides' payout is smallest: 25000.
        chain.insert_leg(leg(24900.0, OptionSide::Call, 1000, now));
        chain.insert_leg(leg(25000.0, OptionSide::Call, 10, now));
        chain.insert_leg(leg(25100.0, OptionSide::Call, 10, now));
        chain.insert_leg(leg(24900.0, OptionSide::Put, 10, now));
        chain.insert_leg(leg(25000.0, OptionSide::Put, 10, now));
        chain.insert_leg(leg(25100.0, OptionSide::Put, 1000, now));

        assert_eq!(chain.max_pain_strike(), 25000.0);
    }

    #[test]
    fn atm_picks_nearest_listed_strike() {
        let now = Utc::now();
        let mut chain = OptionChain::new("NIFTY", now, now);
        chain.insert_leg(leg(24900.0, OptionSide::Call, 1, now));
        chain.insert_leg(leg(25000.0, OptionSide::Call, 1, now));
        chain.insert_leg(leg(25100.0, OptionSide::Call, 1, now));

        assert_eq!(chain.atm_strike(25030.0), 25000.0);
    }

    #[test]
    fn pcr_is_put_oi_over_call_oi() {
        let now = Utc::now();
        let mut chain = OptionChain::new("NIFTY", now, now);
        chain.insert_leg(leg(25000.0, OptionSide::Call, 200, now));
        chain.insert_leg(leg(25000.0, OptionSide::Put, 300, now));

        let agg = chain.aggregates(25000.0);
        assert!((agg.pcr - 1.5).abs() < 1e-9);
    }
}
