//! Open/closed position lifecycle (spec §3, §4.9).

use crate::instrument::InstrumentKey;
use crate::signal::{Direction, Ladder, MarketContext};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionState {
    Open,
    Partial,
    Closed,
}

impl PositionState {
    /// Position state transitions are monotone: OPEN -> (PARTIAL) -> CLOSED,
    /// never backward (spec invariant 6).
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Open, Self::Partial)
                | (Self::Open, Self::Closed)
                | (Self::Partial, Self::Closed)
        )
    }
}

/// A currently-open (or partially-closed) position, owned by the order
/// manager on creation and mutated only by the risk-monitoring loop (price,
/// state-on-exit) and the order manager (state-on-fill).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub position_id: String,
    pub signal_origin_strategy_id: String,
    pub instrument_key: InstrumentKey,
    pub symbol: String,
    pub direction: Direction,
    pub strike: f64,
    pub expiry: DateTime<Utc>,
    pub quantity: u32,
    /// Quantity at entry, fixed for the life of the position; `quantity`
    /// itself shrinks as ladder rungs close part of it.
    pub original_quantity: u32,
    pub entry_price: f64,
    pub entry_time: DateTime<Utc>,
    pub current_price: f64,
    pub unrealised_pnl: f64,
    pub target_price: f64,
    pub stop_loss: f64,
    pub ladder: Option<Ladder>,
    pub state: PositionState,
    pub strategy_id: String,
    pub market_context_entry: MarketContext,
    pub vix_entry: f64,
    pub hour_entry: u32,
    pub minute_entry: u32,
    pub day_of_week_entry: u32,
    /// Fraction of the original quantity already closed via ladder rungs.
    pub ladder_closed_fraction: f64,
}

impl Position {
    /// Recompute unrealised P&L for the current mark (spec §4.9, long-only
    /// semantics per §4.10).
    pub fn mark_to_market(&mut self, current_price: f64) {
        self.current_price = current_price;
        self.unrealised_pnl = match self.direction {
            Direction::Call => (current_price - self.entry_price) * f64::from(self.quantity),
            Direction::Put => (self.entry_price - current_price) * f64::from(self.quantity),
        };
    }

    #[must_use]
    pub fn notional(&self) -> f64 {
        self.entry_price * f64::from(self.quantity)
    }

    pub fn transition_to(&mut self, next: PositionState) -> Result<(), String> {
        if !self.state.can_transition_to(next) {
            return Err(format!(
                "illegal position transition {:?} -> {:?}",
                self.state, next
            ));
        }
        self.state = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_machine_rejects_backward_transitions() {
        assert!(PositionState::Open.can_transition_to(PositionState::Partial));
        assert!(PositionState::Open.can_transition_to(PositionState::Closed));
        assert!(PositionState::Partial.can_transition_to(PositionState::Closed));
        assert!(!PositionState::Closed.can_transition_to(PositionState::Open));
        assert!(!PositionState::Partial.can_transition_to(PositionState::Open));
        assert!(!PositionState::Closed.can_transition_to(PositionState::Partial));
    }
}
