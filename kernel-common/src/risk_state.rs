//! Mutable risk bookkeeping (spec §3, §4.6). Mutated only under the risk
//! state lock, from L2 on admission and from L3 on exit.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskState {
    pub current_capital: f64,
    pub starting_capital: f64,
    pub daily_pnl: f64,
    pub per_strategy_capital_in_use: FxHashMap<String, f64>,
    pub daily_trade_count: u32,
    pub consecutive_losses: u32,
    pub override_active: bool,
}

impl RiskState {
    #[must_use]
    pub fn new(starting_capital: f64) -> Self {
        Self {
            current_capital: starting_capital,
            starting_capital,
            daily_pnl: 0.0,
            per_strategy_capital_in_use: FxHashMap::default(),
            daily_trade_count: 0,
            consecutive_losses: 0,
            override_active: false,
        }
    }

    #[must_use]
    pub fn daily_pnl_pct(&self) -> f64 {
        if self.starting_capital <= 0.0 {
            return 0.0;
        }
        self.daily_pnl / self.starting_capital * 100.0
    }

    #[must_use]
    pub fn strategy_capital_in_use(&self, strategy_id: &str) -> f64 {
        self.per_strategy_capital_in_use
            .get(strategy_id)
            .copied()
            .unwrap_or(0.0)
    }

    pub fn reset_daily(&mut self) {
        self.daily_pnl = 0.0;
        self.daily_trade_count = 0;
        self.consecutive_losses = 0;
        self.per_strategy_capital_in_use.clear();
        self.current_capital = self.starting_capital;
    }
}
