//! Trading signals (spec §3, §4.2, §4.5). Immutable once produced.

use crate::greeks::Greeks;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Call,
    Put,
}

/// Market conditions a signal was produced under, carried through to the
/// position and trade records for post-hoc analysis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketContext {
    pub spot: f64,
    pub iv: f64,
    pub vix: f64,
    pub pcr: f64,
}

/// Optional partial-exit ladder (spec §4.9); when present, 1/3 of the
/// position closes at each rung (spec §9 open question #2).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ladder {
    pub t1: f64,
    pub t2: f64,
    pub t3: f64,
}

/// A strategy's proposed trade, before scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub strategy_id: String,
    pub symbol: String,
    pub direction: Direction,
    pub strike: f64,
    pub expiry: DateTime<Utc>,
    pub entry_price: f64,
    pub target_price: f64,
    pub stop_loss: f64,
    pub ladder: Option<Ladder>,
    /// 0-100.
    pub strength: f64,
    pub reason: String,
    pub greeks: Greeks,
    pub market_context: MarketContext,
    pub produced_at: DateTime<Utc>,
    /// Count of corroborating indicators the strategy itself observed;
    /// feeds the scorer's composite tie-break (spec §4.5).
    pub supporting_factors: u32,
}

impl Signal {
    /// Reward:risk ratio used by the scorer's tie-break term.
    #[must_use]
    pub fn reward_risk_ratio(&self) -> f64 {
        let risk = (self.entry_price - self.stop_loss).abs();
        if risk <= 0.0 {
            return 0.0;
        }
        (self.target_price - self.entry_price).abs() / risk
    }

    /// A signal with an all-zero Greeks snapshot violates the strategy
    /// contract (spec §4.2) and must be dropped, not scored.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        !self.greeks.is_all_zero()
            && self.entry_price > 0.0
            && self.strength.is_finite()
            && (0.0..=100.0).contains(&self.strength)
    }
}

/// A signal after the scorer has attached an ML probability (spec §4.5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredSignal {
    pub signal: Signal,
    pub ml_probability: f64,
    pub composite: f64,
}
