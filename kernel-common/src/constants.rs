//! Closed-set constants the core treats as fixed domain knowledge.

use std::time::Duration;

/// Lot size (minimum tradable quantity) per underlying.
#[must_use]
pub fn lot_size(underlying: &str) -> u32 {
    match underlying {
        "NIFTY" => 75,
        "BANKNIFTY" => 15,
        "SENSEX" => 20,
        _ => 1,
    }
}

/// Market hours, IST, inclusive.
pub const MARKET_OPEN_HHMM: (u32, u32) = (9, 15);
pub const MARKET_CLOSE_HHMM: (u32, u32) = (15, 30);

/// Forced EOD square-off time, one minute before close.
pub const EOD_FORCE_EXIT_HHMM: (u32, u32) = (15, 29);

/// A leg older than this is stale and must not drive trading decisions.
pub const STALE_THRESHOLD: Duration = Duration::from_secs(10);

/// Event bus heartbeat cadence.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Default refresh cadence for the market-data loop (L1).
pub const REFRESH_INTERVAL_OPEN: Duration = Duration::from_secs(30);
pub const REFRESH_INTERVAL_IDLE: Duration = Duration::from_secs(60);
pub const REFRESH_INTERVAL_VIX_SPIKE: Duration = Duration::from_secs(20);
pub const VIX_SPIKE_REFRESH_THRESHOLD: f64 = 25.0;

/// Default decision cadence for the signal-trading loop (L2).
pub const DECISION_INTERVAL: Duration = Duration::from_secs(30);

/// Default monitor cadence for the risk-monitoring loop (L3).
pub const MONITOR_INTERVAL: Duration = Duration::from_secs(2);

/// Reasonable bound on leg prices; anything outside is a data-quality fault.
pub const MIN_PLAUSIBLE_LTP: f64 = 0.0;

/// Fraction of T1/T2/T3 ladder closed at each rung (spec open question #2:
/// we pick an equal one-third split and keep it fixed).
pub const LADDER_CLOSE_FRACTION: f64 = 1.0 / 3.0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lot_sizes_match_spec() {
        assert_eq!(lot_size("NIFTY"), 75);
        assert_eq!(lot_size("BANKNIFTY"), 15);
        assert_eq!(lot_size("SENSEX"), 20);
    }
}
