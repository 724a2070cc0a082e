//! Closed position records (spec §3, §4.10). Immutable once written.

use crate::instrument::InstrumentKey;
use crate::signal::{Direction, MarketContext};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    Target,
    StopLoss,
    Eod,
    Reversal,
    Manual,
    Circuit,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub brokerage: f64,
    pub stt: f64,
    pub exchange: f64,
    pub gst: f64,
    pub sebi: f64,
    pub stamp: f64,
}

impl FeeBreakdown {
    #[must_use]
    pub fn total(&self) -> f64 {
        self.brokerage + self.stt + self.exchange + self.gst + self.sebi + self.stamp
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub position_id: String,
    pub instrument_key: InstrumentKey,
    pub symbol: String,
    pub direction: Direction,
    pub strike: f64,
    pub expiry: DateTime<Utc>,
    pub quantity: u32,
    pub entry_price: f64,
    pub entry_time: DateTime<Utc>,
    pub strategy_id: String,
    pub market_context_entry: MarketContext,
    pub vix_entry: f64,

    pub exit_time: DateTime<Utc>,
    pub exit_price: f64,
    pub exit_reason: ExitReason,
    pub gross_pnl: f64,
    pub fees: FeeBreakdown,
    pub net_pnl: f64,
    pub market_context_exit: MarketContext,
    pub hold_duration_secs: i64,
}
