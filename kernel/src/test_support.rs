//! Fixture builders shared by the kernel crate's own unit tests.
#![cfg(test)]

use crate::persistence::NullPersistenceSink;
use crate::reversal::NeverReverses;
use crate::state::KernelState;
use chrono::{TimeZone, Utc};
use kernel_common::config::{Settings, TradingMode};
use kernel_common::instrument::{InstrumentKey, Underlying};
use kernel_common::position::{Position, PositionState};
use kernel_common::signal::{Direction, MarketContext};
use kernel_execution::OrderManager;
use kernel_market_data::simulated::{SimulatedBrokerAdapter, SimulatedBrokerConfig};
use kernel_strategies::StrategyRegistry;
use std::sync::Arc;

/// A representative open NIFTY call position, entered flat (current price
/// equal to entry) so callers can mark it to whatever price their test
/// needs without fighting a pre-existing unrealised P&L.
pub fn sample_position() -> Position {
    let entry_time = Utc.with_ymd_and_hms(2026, 7, 28, 10, 0, 0).unwrap();
    Position {
        position_id: "pos-test-1".to_string(),
        signal_origin_strategy_id: "pcr_analysis".to_string(),
        instrument_key: InstrumentKey::new("NIFTY25000CE"),
        symbol: "NIFTY".to_string(),
        direction: Direction::Call,
        strike: 25_000.0,
        expiry: entry_time,
        quantity: 75,
        original_quantity: 75,
        entry_price: 100.0,
        entry_time,
        current_price: 100.0,
        unrealised_pnl: 0.0,
        target_price: 150.0,
        stop_loss: 70.0,
        ladder: None,
        state: PositionState::Open,
        strategy_id: "pcr_analysis".to_string(),
        market_context_entry: MarketContext { spot: 25_000.0, iv: 0.15, vix: 14.0, pcr: 1.0 },
        vix_entry: 14.0,
        hour_entry: 10,
        minute_entry: 0,
        day_of_week_entry: 2,
        ladder_closed_fraction: 0.0,
    }
}

/// A fully wired [`KernelState`] over the simulated broker, for tests that
/// exercise control-surface operations or a loop cycle without a live
/// broker or database behind them.
pub fn test_kernel_state() -> Arc<KernelState> {
    let broker: Arc<dyn kernel_market_data::BrokerAdapter> =
        Arc::new(SimulatedBrokerAdapter::new(SimulatedBrokerConfig::default()));
    let order_manager = Arc::new(OrderManager::new(Arc::clone(&broker), TradingMode::Paper));
    let settings = Settings { emergency_credential: "test-credential".to_string(), ..Settings::default() };

    Arc::new(KernelState::new(
        settings,
        broker,
        StrategyRegistry::with_defaults(),
        order_manager,
        Arc::new(kernel_events::EventBus::new(kernel_events::EventBusConfig::default())),
        Arc::new(NullPersistenceSink),
        Arc::new(NeverReverses),
        vec![Underlying::Nifty, Underlying::BankNifty, Underlying::Sensex],
        InstrumentKey::new("SIM-VIX"),
    ))
}
