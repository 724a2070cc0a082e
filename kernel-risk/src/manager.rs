//! Risk manager (spec §4.6): admission, sizing, and bookkeeping. Risk state
//! is mutated only from here (on admission) and from the position tracker
//! (on exit), under a single short-lived lock (spec §5).

use crate::decision::{Decision, RejectReason};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use kernel_clock::{is_market_hours, should_force_eod_exit};
use kernel_common::constants::lot_size;
use kernel_common::errors::{KernelError, KernelResult};
use kernel_common::risk_state::RiskState;
use kernel_common::signal::ScoredSignal;
use kernel_common::trade::Trade;
use kernel_common::{AllocationSource, CircuitBreakerState, Settings};

pub struct RiskManager<'a> {
    settings: &'a Settings,
    allocations: &'a dyn AllocationSource,
}

impl<'a> RiskManager<'a> {
    #[must_use]
    pub fn new(settings: &'a Settings, allocations: &'a dyn AllocationSource) -> Self {
        Self { settings, allocations }
    }

    /// Whether `scored` may be submitted given the current risk state and
    /// circuit breaker. Does not mutate `risk_state`.
    #[must_use]
    pub fn can_take_trade(
        &self,
        scored: &ScoredSignal,
        risk_state: &RiskState,
        circuit: &CircuitBreakerState,
        now_ist: DateTime<Tz>,
    ) -> Decision {
        if circuit.is_open() {
            return Decision::Reject(RejectReason::CircuitBreakerOpen);
        }
        if risk_state.override_active {
            return Decision::Reject(RejectReason::OverrideActive);
        }
        if !is_market_hours(now_ist) || should_force_eod_exit(now_ist) {
            return Decision::Reject(RejectReason::OutsideMarketHoursOrEod);
        }
        if risk_state.daily_trade_count >= self.settings.max_trades_per_day {
            return Decision::Reject(RejectReason::DailyTradeCountCap);
        }
        if risk_state.daily_pnl_pct() <= -self.settings.max_daily_loss_pct {
            return Decision::Reject(RejectReason::DailyLossGate);
        }

        let committed: f64 = risk_state.per_strategy_capital_in_use.values().sum();
        if committed >= risk_state.starting_capital * self.settings.max_capital_fraction {
            return Decision::Reject(RejectReason::CapitalCap);
        }

        let canonical_id = &scored.signal.strategy_id;
        let strategy_cap = risk_state.starting_capital * self.allocations.allocation(canonical_id);
        if risk_state.strategy_capital_in_use(canonical_id) >= strategy_cap {
            return Decision::Reject(RejectReason::PerStrategyCap);
        }

        Decision::Admit
    }

    /// Integer quantity, a positive multiple of the instrument's lot size,
    /// or 0 if sizing floors to zero or the premium cost exceeds the
    /// per-trade capital cap (spec §4.6).
    #[must_use]
    pub fn size_position(&self, scored: &ScoredSignal, risk_state: &RiskState) -> u32 {
        let lot = lot_size(&scored.signal.symbol);
        let mut risk_fraction = self.settings.per_trade_risk_pct / 100.0;
        if self.settings.aggressive_mode && scored.ml_probability > 0.7 {
            risk_fraction *= 1.5;
        }
        risk_fraction = risk_fraction.min(self.settings.hard_cap_capital_fraction);

        let risk_capital = risk_state.starting_capital * risk_fraction;
        let stop_distance = (scored.signal.entry_price - scored.signal.stop_loss).abs();
        if stop_distance <= 0.0 {
            return 0;
        }

        let raw_units = (risk_capital / stop_distance).floor();
        if raw_units < f64::from(lot) {
            return 0;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let quantity = (raw_units as u32 / lot) * lot;
        if quantity == 0 {
            return 0;
        }

        let premium_cost = scored.signal.entry_price * f64::from(quantity);
        let per_trade_cap = risk_state.starting_capital * self.settings.per_trade_capital_fraction;
        if premium_cost > per_trade_cap {
            return 0;
        }

        quantity
    }

    /// Updates daily P&L and per-strategy capital-in-use from a closed
    /// trade's net (post-fee) P&L, keyed by its canonical strategy id.
    pub fn record_trade(&self, risk_state: &mut RiskState, trade: &Trade) {
        risk_state.daily_pnl += trade.net_pnl;
        risk_state.current_capital += trade.net_pnl;
        risk_state.daily_trade_count += 1;
        if trade.net_pnl < 0.0 {
            risk_state.consecutive_losses += 1;
        } else {
            risk_state.consecutive_losses = 0;
        }

        let notional = trade.entry_price * f64::from(trade.quantity);
        let entry = risk_state
            .per_strategy_capital_in_use
            .entry(trade.strategy_id.clone())
            .or_insert(0.0);
        *entry = (*entry - notional).max(0.0);
    }

    /// Reserves the capital a newly admitted trade will occupy, called by
    /// the order manager immediately after a fill (mirrors `record_trade`'s
    /// release on close).
    pub fn reserve_capital(&self, risk_state: &mut RiskState, canonical_id: &str, notional: f64) {
        *risk_state.per_strategy_capital_in_use.entry(canonical_id.to_string()).or_insert(0.0) += notional;
    }

    #[must_use]
    pub fn should_exit_eod(&self, now_ist: DateTime<Tz>) -> bool {
        should_force_eod_exit(now_ist)
    }
}

/// Validates and applies a settings update (spec §6 `update_settings`,
/// applied atomically at the next L2 cycle per the caller).
pub fn validate_settings_update(candidate: &Settings) -> KernelResult<()> {
    candidate
        .validate()
        .map_err(|e| KernelError::Validation(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Asia::Kolkata;
    use kernel_common::greeks::Greeks;
    use kernel_common::signal::{Direction, MarketContext, Signal};

    struct FixedAllocation(f64);
    impl AllocationSource for FixedAllocation {
        fn allocation(&self, _canonical_id: &str) -> f64 {
            self.0
        }
    }

    fn market_open_ist() -> DateTime<Tz> {
        Kolkata.with_ymd_and_hms(2026, 7, 28, 11, 0, 0).unwrap()
    }

    fn scored_signal(strategy_id: &str, entry: f64, stop: f64, ml_probability: f64) -> ScoredSignal {
        ScoredSignal {
            signal: Signal {
                strategy_id: strategy_id.to_string(),
                symbol: "NIFTY".to_string(),
                direction: Direction::Call,
                strike: 25000.0,
                expiry: Utc::now(),
                entry_price: entry,
                target_price: entry * 1.5,
                stop_loss: stop,
                ladder: None,
                strength: 80.0,
                reason: "test".to_string(),
                greeks: Greeks {
                    delta: 0.5,
                    gamma: 0.01,
                    theta: -1.0,
                    vega: 1.0,
                },
                market_context: MarketContext {
                    spot: 25000.0,
                    iv: 0.15,
                    vix: 14.0,
                    pcr: 1.0,
                },
                produced_at: Utc::now(),
                supporting_factors: 3,
            },
            ml_probability,
            composite: 0.8,
        }
    }

    #[test]
    fn rejects_when_circuit_breaker_open() {
        let settings = Settings::default();
        let allocations = FixedAllocation(0.12);
        let manager = RiskManager::new(&settings, &allocations);
        let risk_state = RiskState::new(100_000.0);
        let mut circuit = CircuitBreakerState::default();
        circuit.latched = kernel_common::circuit_state::Latched::Open;

        let decision = manager.can_take_trade(&scored_signal("pcr_analysis", 100.0, 70.0, 0.8), &risk_state, &circuit, market_open_ist());
        assert_eq!(decision, Decision::Reject(RejectReason::CircuitBreakerOpen));
    }

    #[test]
    fn rejects_outside_market_hours() {
        let settings = Settings::default();
        let allocations = FixedAllocation(0.12);
        let manager = RiskManager::new(&settings, &allocations);
        let risk_state = RiskState::new(100_000.0);
        let circuit = CircuitBreakerState::default();
        let off_hours = Kolkata.with_ymd_and_hms(2026, 7, 28, 20, 0, 0).unwrap();

        let decision = manager.can_take_trade(&scored_signal("pcr_analysis", 100.0, 70.0, 0.8), &risk_state, &circuit, off_hours);
        assert_eq!(decision, Decision::Reject(RejectReason::OutsideMarketHoursOrEod));
    }

    #[test]
    fn admits_a_well_formed_signal_within_limits() {
        let settings = Settings::default();
        let allocations = FixedAllocation(0.12);
        let manager = RiskManager::new(&settings, &allocations);
        let risk_state = RiskState::new(100_000.0);
        let circuit = CircuitBreakerState::default();

        let decision = manager.can_take_trade(&scored_signal("pcr_analysis", 100.0, 70.0, 0.8), &risk_state, &circuit, market_open_ist());
        assert_eq!(decision, Decision::Admit);
    }

    #[test]
    fn sizing_floors_to_a_lot_multiple() {
        let settings = Settings::default();
        let allocations = FixedAllocation(0.12);
        let manager = RiskManager::new(&settings, &allocations);
        let risk_state = RiskState::new(100_000.0);

        let qty = manager.size_position(&scored_signal("pcr_analysis", 100.0, 70.0, 0.8), &risk_state);
        assert_eq!(qty % 75, 0); // NIFTY lot size
    }

    #[test]
    fn s1_admission_and_sizing() {
        // spec §8 S1: starting_capital=100,000; per_trade_risk_pct=2;
        // allocation(pcr_analysis)=0.15; entry=125, stop=100, strength=80,
        // ml=0.8. Expect admission and quantity floored to a multiple of 75
        // such that (entry-stop)*qty <= 2,000, with per-strategy in-use
        // (notional = entry*qty) comfortably under 15,000.
        let settings = Settings::default();
        let allocations = FixedAllocation(0.15);
        let manager = RiskManager::new(&settings, &allocations);
        let risk_state = RiskState::new(100_000.0);
        let circuit = CircuitBreakerState::default();
        let scored = scored_signal("pcr_analysis", 125.0, 100.0, 0.8);

        assert_eq!(manager.can_take_trade(&scored, &risk_state, &circuit, market_open_ist()), Decision::Admit);

        let qty = manager.size_position(&scored, &risk_state);
        assert_eq!(qty, 75);
        assert!((scored.signal.entry_price - scored.signal.stop_loss) * f64::from(qty) <= 2_000.0);
        assert!(scored.signal.entry_price * f64::from(qty) <= 15_000.0);
    }

    #[test]
    fn s2_aggressive_boost_caps_at_three_percent() {
        // spec §8 S2: same as S1 with aggressive_mode=on, ml=0.75. The risk
        // multiplier of 1.5 lands exactly at the 3% hard cap (=3,000), and
        // quantity still floors to a lot-size multiple.
        let mut settings = Settings::default();
        settings.aggressive_mode = true;
        let allocations = FixedAllocation(0.15);
        let manager = RiskManager::new(&settings, &allocations);
        let risk_state = RiskState::new(100_000.0);
        let scored = scored_signal("pcr_analysis", 125.0, 100.0, 0.75);

        let qty = manager.size_position(&scored, &risk_state);
        assert_eq!(qty % 75, 0);
        assert!(qty > 0);
        assert!((scored.signal.entry_price - scored.signal.stop_loss) * f64::from(qty) <= 3_000.0 + 1e-9);
    }

    #[test]
    fn sizing_returns_zero_when_stop_distance_is_zero() {
        let settings = Settings::default();
        let allocations = FixedAllocation(0.12);
        let manager = RiskManager::new(&settings, &allocations);
        let risk_state = RiskState::new(100_000.0);

        let qty = manager.size_position(&scored_signal("pcr_analysis", 100.0, 100.0, 0.8), &risk_state);
        assert_eq!(qty, 0);
    }
}
