//! The read-side view L2/L3 consume from the market-state cache (spec §3,
//! §4.3). Produced by a single writer (L1) and swapped in behind an
//! `arc_swap`/`ArcSwap`-style atomic pointer; readers always see a fully
//! formed, internally consistent snapshot, never a partial update.

use crate::option_chain::OptionChain;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Rolling-window technical indicators computed over the underlying's spot
/// series (spec §4.3). `None` until the warm-up window has enough samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TechnicalIndicators {
    pub rsi_14: Option<f64>,
    pub bollinger_upper: Option<f64>,
    pub bollinger_lower: Option<f64>,
    pub atr_14: Option<f64>,
    pub vwap_zscore: Option<f64>,
}

impl TechnicalIndicators {
    #[must_use]
    pub const fn is_warmed_up(&self) -> bool {
        self.rsi_14.is_some() && self.atr_14.is_some() && self.vwap_zscore.is_some()
    }
}

/// Everything L2/L3 need to know about one underlying at an instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnderlyingSnapshot {
    pub spot: f64,
    pub atm_strike: f64,
    pub current_weekly_expiry: DateTime<Utc>,
    pub option_chain: OptionChain,
    pub indicators: TechnicalIndicators,
    pub last_refresh: DateTime<Utc>,
}

impl UnderlyingSnapshot {
    #[must_use]
    pub fn age_secs(&self, now: DateTime<Utc>) -> i64 {
        (now - self.last_refresh).num_seconds().max(0)
    }
}

/// The full market-state cache content, one per underlying plus a shared
/// India VIX reading (spec §4.3 cross-cutting condition).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub underlyings: BTreeMap<String, UnderlyingSnapshot>,
    pub vix: f64,
    pub generated_at: DateTime<Utc>,
}

impl MarketSnapshot {
    #[must_use]
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            underlyings: BTreeMap::new(),
            vix: 0.0,
            generated_at: now,
        }
    }

    #[must_use]
    pub fn get(&self, underlying: &str) -> Option<&UnderlyingSnapshot> {
        self.underlyings.get(underlying)
    }

    /// True once VIX has crossed the spike threshold that shortens the
    /// REST refresh interval (spec §4.1, `VIX_SPIKE_REFRESH_THRESHOLD`).
    #[must_use]
    pub fn is_vix_spiking(&self, threshold: f64) -> bool {
        self.vix >= threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn empty_snapshot_has_no_underlyings() {
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 9, 15, 0).unwrap();
        let snap = MarketSnapshot::empty(now);
        assert!(snap.get("NIFTY").is_none());
    }

    #[test]
    fn vix_spike_threshold_is_inclusive() {
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 9, 15, 0).unwrap();
        let mut snap = MarketSnapshot::empty(now);
        snap.vix = 25.0;
        assert!(snap.is_vix_spiking(25.0));
        assert!(!snap.is_vix_spiking(25.01));
    }
}
