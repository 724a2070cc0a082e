//! Order manager: paper/live execution at the signal level (spec §4.8).
//!
//! Both modes are driven through the same entry point so callers never
//! branch on trading mode themselves; only [`OrderManager::submit`] does.

use crate::errors::{ExecutionError, ExecutionResult};
use crate::lifecycle::{can_transition, OrderLifecycleState};
use crate::slippage::{execution_price, SlippageInputs};
use chrono::{DateTime, Utc};
use kernel_common::config::TradingMode;
use kernel_common::instrument::InstrumentKey;
use kernel_common::signal::ScoredSignal;
use kernel_common::{Backoff, Position, PositionState};
use kernel_market_data::broker::{BrokerAdapter, BrokerOrderRequest, BrokerOrderStatus, OrderSide};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

const CANCEL_MAX_ATTEMPTS: u32 = 3;
const CANCEL_BACKOFF_FLOOR: Duration = Duration::from_millis(200);
const CANCEL_BACKOFF_CEILING: Duration = Duration::from_secs(5);

/// A live order awaiting its first fill. Paper-mode submissions never
/// produce one: the synthetic fill is recorded immediately.
pub struct PendingOrder {
    pub broker_order_id: String,
    pub instrument_key: InstrumentKey,
    pub state: OrderLifecycleState,
    intent: PositionIntent,
}

/// Everything needed to materialise a [`Position`] once a fill confirms,
/// carried alongside the order while it's in flight.
#[derive(Clone)]
struct PositionIntent {
    signal: ScoredSignal,
    underlying_symbol: String,
    instrument_key: InstrumentKey,
    quantity: u32,
}

pub enum SubmitOutcome {
    Filled(Position),
    Pending(PendingOrder),
}

pub struct OrderManager {
    broker: Arc<dyn BrokerAdapter>,
    mode: TradingMode,
}

impl OrderManager {
    #[must_use]
    pub fn new(broker: Arc<dyn BrokerAdapter>, mode: TradingMode) -> Self {
        Self { broker, mode }
    }

    #[must_use]
    pub const fn mode(&self) -> TradingMode {
        self.mode
    }

    /// Submits a signal for execution. Subscribes the instrument to the push
    /// feed on success (spec §4.8 "subscribes the instrument-key ... and
    /// registers a callback that routes every tick into the position
    /// tracker" — the callback wiring itself lives in the trading loop that
    /// owns both this manager and the position tracker).
    pub async fn submit(
        &self,
        scored: &ScoredSignal,
        underlying_symbol: &str,
        quantity: u32,
        lot_size: u32,
        vix: f64,
        now: DateTime<Utc>,
    ) -> ExecutionResult<SubmitOutcome> {
        let instrument_key = InstrumentKey::new(format!(
            "{underlying_symbol}-{}-{:?}",
            scored.signal.strike, scored.signal.direction
        ));

        let outcome = match self.mode {
            TradingMode::Paper => {
                let fill_price = execution_price(SlippageInputs {
                    ltp: scored.signal.entry_price,
                    quantity,
                    lot_size,
                    vix,
                    side: direction_to_side(scored.signal.direction),
                });
                info!(symbol = underlying_symbol, fill_price, "paper fill recorded");
                SubmitOutcome::Filled(build_position(scored, underlying_symbol, instrument_key.clone(), quantity, fill_price, now))
            }
            TradingMode::Live => {
                let request = BrokerOrderRequest {
                    instrument_key: instrument_key.clone(),
                    side: OrderSide::Buy,
                    quantity,
                    limit_price: None,
                };
                let ack = self.broker.place_order(request).await?;
                SubmitOutcome::Pending(PendingOrder {
                    broker_order_id: ack.broker_order_id,
                    instrument_key: instrument_key.clone(),
                    state: OrderLifecycleState::Submitted,
                    intent: PositionIntent {
                        signal: scored.clone(),
                        underlying_symbol: underlying_symbol.to_string(),
                        instrument_key: instrument_key.clone(),
                        quantity,
                    },
                })
            }
        };

        self.broker.subscribe(std::slice::from_ref(&instrument_key)).await?;
        Ok(outcome)
    }

    /// Polls a live order's status and, on its first fill, materialises the
    /// position. Returns `None` while still in flight.
    pub async fn poll_fill(&self, pending: &mut PendingOrder, now: DateTime<Utc>) -> ExecutionResult<Option<Position>> {
        let status = self.broker.order_status(&pending.broker_order_id).await?;

        let (next_state, filled) = match status {
            BrokerOrderStatus::Submitted => (OrderLifecycleState::Submitted, None),
            BrokerOrderStatus::PartiallyFilled { avg_price, .. } => (OrderLifecycleState::PartiallyFilled, Some(avg_price)),
            BrokerOrderStatus::Filled { avg_price, .. } => (OrderLifecycleState::Filled, Some(avg_price)),
            BrokerOrderStatus::Rejected(reason) => {
                pending.state = OrderLifecycleState::Rejected;
                return Err(ExecutionError::Rejected(reason));
            }
            BrokerOrderStatus::Cancelled => (OrderLifecycleState::Cancelled, None),
        };

        if !can_transition(pending.state, next_state) && pending.state != next_state {
            return Err(ExecutionError::IllegalTransition);
        }
        let already_reported = pending.state == OrderLifecycleState::PartiallyFilled || pending.state == OrderLifecycleState::Filled;
        pending.state = next_state;

        match filled {
            Some(avg_price) if !already_reported => Ok(Some(build_position(
                &pending.intent.signal,
                &pending.intent.underlying_symbol,
                pending.intent.instrument_key.clone(),
                pending.intent.quantity,
                avg_price,
                now,
            ))),
            _ => Ok(None),
        }
    }

    /// Cancels a live order, retrying on timeout up to `CANCEL_MAX_ATTEMPTS`
    /// times with exponential backoff (spec §4.8).
    pub async fn cancel_with_retry(&self, broker_order_id: &str) -> ExecutionResult<()> {
        let mut backoff = Backoff::new(CANCEL_BACKOFF_FLOOR, CANCEL_BACKOFF_CEILING);
        let mut last_err = None;

        for attempt in 0..CANCEL_MAX_ATTEMPTS {
            match self.broker.cancel_order(broker_order_id).await {
                Ok(()) => return Ok(()),
                Err(err) if err.is_transient() => {
                    warn!(attempt, error = %err, "cancel timed out, retrying");
                    last_err = Some(err);
                    tokio::time::sleep(backoff.next_delay()).await;
                }
                Err(err) => return Err(ExecutionError::Broker(err)),
            }
        }

        Err(last_err.map_or(ExecutionError::CancelExhausted { attempts: CANCEL_MAX_ATTEMPTS }, |_| {
            ExecutionError::CancelExhausted { attempts: CANCEL_MAX_ATTEMPTS }
        }))
    }

    /// Unsubscribes on position close (spec §4.8).
    pub async fn on_position_closed(&self, instrument_key: &InstrumentKey) -> ExecutionResult<()> {
        self.broker.unsubscribe(std::slice::from_ref(instrument_key)).await?;
        Ok(())
    }
}

const fn direction_to_side(direction: kernel_common::signal::Direction) -> kernel_common::instrument::OptionSide {
    match direction {
        kernel_common::signal::Direction::Call => kernel_common::instrument::OptionSide::Call,
        kernel_common::signal::Direction::Put => kernel_common::instrument::OptionSide::Put,
    }
}

fn build_position(
    scored: &ScoredSignal,
    underlying_symbol: &str,
    instrument_key: InstrumentKey,
    quantity: u32,
    fill_price: f64,
    now: DateTime<Utc>,
) -> Position {
    use chrono::{Datelike, Timelike};

    let signal = &scored.signal;
    Position {
        position_id: Uuid::new_v4().to_string(),
        signal_origin_strategy_id: signal.strategy_id.clone(),
        instrument_key,
        symbol: underlying_symbol.to_string(),
        direction: signal.direction,
        strike: signal.strike,
        expiry: signal.expiry,
        quantity,
        original_quantity: quantity,
        entry_price: fill_price,
        entry_time: now,
        current_price: fill_price,
        unrealised_pnl: 0.0,
        target_price: signal.target_price,
        stop_loss: signal.stop_loss,
        ladder: signal.ladder,
        state: PositionState::Open,
        strategy_id: signal.strategy_id.clone(),
        market_context_entry: signal.market_context,
        vix_entry: signal.market_context.vix,
        hour_entry: now.hour(),
        minute_entry: now.minute(),
        day_of_week_entry: now.weekday().num_days_from_monday(),
        ladder_closed_fraction: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use kernel_common::greeks::Greeks;
    use kernel_common::instrument::Underlying;
    use kernel_common::option_chain::OptionChain;
    use kernel_common::signal::{Direction, MarketContext, Signal};
    use kernel_common::KernelResult;
    use kernel_market_data::broker::{BrokerOrderAck, BrokerPosition, Tick, TokenStatus};
    use tokio::sync::broadcast;

    struct StubBroker {
        status: BrokerOrderStatus,
    }

    #[async_trait]
    impl BrokerAdapter for StubBroker {
        async fn quote_by_instrument_keys(&self, _keys: &[InstrumentKey]) -> KernelResult<Vec<Tick>> {
            Ok(vec![])
        }
        async fn option_contract_discovery(&self, _underlying: Underlying) -> KernelResult<Vec<InstrumentKey>> {
            Ok(vec![])
        }
        async fn option_chain_by_expiry(
            &self,
            underlying: Underlying,
            expiry: DateTime<Utc>,
            now: DateTime<Utc>,
        ) -> KernelResult<OptionChain> {
            Ok(OptionChain::new(underlying.symbol(), expiry, now))
        }
        async fn place_order(&self, _request: BrokerOrderRequest) -> KernelResult<BrokerOrderAck> {
            Ok(BrokerOrderAck { broker_order_id: "ORD-1".to_string() })
        }
        async fn cancel_order(&self, _broker_order_id: &str) -> KernelResult<()> {
            Ok(())
        }
        async fn order_status(&self, _broker_order_id: &str) -> KernelResult<BrokerOrderStatus> {
            Ok(self.status.clone())
        }
        async fn positions(&self) -> KernelResult<Vec<BrokerPosition>> {
            Ok(vec![])
        }
        async fn subscribe(&self, _keys: &[InstrumentKey]) -> KernelResult<()> {
            Ok(())
        }
        async fn unsubscribe(&self, _keys: &[InstrumentKey]) -> KernelResult<()> {
            Ok(())
        }
        fn tick_receiver(&self) -> broadcast::Receiver<Tick> {
            broadcast::channel(1).1
        }
        fn token_status(&self) -> TokenStatus {
            TokenStatus { expires_at: Utc::now() }
        }
    }

    fn sample_scored() -> ScoredSignal {
        ScoredSignal {
            signal: Signal {
                strategy_id: "pcr_analysis".to_string(),
                symbol: "NIFTY".to_string(),
                direction: Direction::Call,
                strike: 25000.0,
                expiry: Utc::now(),
                entry_price: 120.0,
                target_price: 180.0,
                stop_loss: 84.0,
                ladder: None,
                strength: 70.0,
                reason: "test".to_string(),
                greeks: Greeks { delta: 0.5, gamma: 0.01, theta: -2.0, vega: 5.0 },
                market_context: MarketContext { spot: 25010.0, iv: 0.15, vix: 15.0, pcr: 1.1 },
                produced_at: Utc::now(),
                supporting_factors: 2,
            },
            ml_probability: 0.8,
            composite: 0.75,
        }
    }

    #[tokio::test]
    async fn paper_mode_fills_immediately() {
        let broker = Arc::new(StubBroker { status: BrokerOrderStatus::Submitted });
        let manager = OrderManager::new(broker, TradingMode::Paper);
        let scored = sample_scored();

        let outcome = manager.submit(&scored, "NIFTY", 75, 75, 15.0, Utc::now()).await.unwrap();
        match outcome {
            SubmitOutcome::Filled(position) => {
                assert_eq!(position.quantity, 75);
                assert!(position.entry_price > 120.0);
            }
            SubmitOutcome::Pending(_) => panic!("paper mode must fill synchronously"),
        }
    }

    #[tokio::test]
    async fn live_mode_returns_pending_until_filled() {
        let broker = Arc::new(StubBroker { status: BrokerOrderStatus::Submitted });
        let manager = OrderManager::new(broker, TradingMode::Live);
        let scored = sample_scored();

        let outcome = manager.submit(&scored, "NIFTY", 75, 75, 15.0, Utc::now()).await.unwrap();
        let SubmitOutcome::Pending(mut pending) = outcome else {
            panic!("live mode must return a pending order");
        };
        assert_eq!(pending.state, OrderLifecycleState::Submitted);

        let position = manager.poll_fill(&mut pending, Utc::now()).await.unwrap();
        assert!(position.is_none());
    }

    #[tokio::test]
    async fn live_mode_emits_a_position_on_fill() {
        let broker = Arc::new(StubBroker {
            status: BrokerOrderStatus::Filled { filled_quantity: 75, avg_price: 121.5 },
        });
        let manager = OrderManager::new(broker, TradingMode::Live);
        let scored = sample_scored();

        let outcome = manager.submit(&scored, "NIFTY", 75, 75, 15.0, Utc::now()).await.unwrap();
        let SubmitOutcome::Pending(mut pending) = outcome else {
            panic!("live mode must return a pending order");
        };

        let position = manager.poll_fill(&mut pending, Utc::now()).await.unwrap().expect("should fill");
        assert!((position.entry_price - 121.5).abs() < 1e-9);
        assert_eq!(pending.state, OrderLifecycleState::Filled);
    }
}
