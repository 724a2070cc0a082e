//! (L3) Risk-monitoring loop (spec §4.12): re-marks every open position each
//! tick against the cache, evaluates exits in the tracker's fixed order,
//! settles closed quantity into trades, and evaluates circuit-breaker
//! triggers. Never skipped: a crash here gets its own dedicated trigger
//! (`Trigger::MonitorLoopFailure`) rather than just a silent restart,
//! because missing a position's risk budget matters more than staying open.

use crate::persistence::PersistenceSink;
use crate::reversal::ReversalDetector;
use crate::state::KernelState;
use chrono::{DateTime, Utc};
use kernel_common::config::Settings;
use kernel_common::instrument::OptionSide;
use kernel_common::signal::{Direction, MarketContext};
use kernel_common::trade::{ExitReason, Trade};
use kernel_common::position::Position;
use kernel_events::{AlertLevel, KernelEvent};
use kernel_portfolio::fees::IndianMarketsFeeSchedule;
use kernel_portfolio::pnl;
use kernel_portfolio::tracker::{ExitContext, UpdateOutcome};
use kernel_risk::circuit_breaker::{check_daily_loss, check_iv_shock, check_vix_spike, IvSample};
use kernel_risk::RiskManager;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// `PnlUpdate` is published every Nth cycle rather than every cycle, per
/// spec §4.11's "coarser cadence" for this message kind relative to the
/// per-position `position_update`.
const PNL_UPDATE_EVERY_N_CYCLES: u32 = 5;

pub(crate) const fn side_of(direction: Direction) -> OptionSide {
    match direction {
        Direction::Call => OptionSide::Call,
        Direction::Put => OptionSide::Put,
    }
}

/// Runs until shutdown, on `settings.monitor_interval_s` cadence regardless
/// of market hours: a position opened before close must still be watched
/// for its forced EOD exit.
pub async fn run(state: Arc<KernelState>) {
    let mut cycle: u32 = 0;

    loop {
        if state.is_shutting_down() {
            info!("L3 risk-monitoring loop stopping");
            return;
        }

        let settings = state.current_settings();
        cycle = cycle.wrapping_add(1);
        run_cycle(&state, &settings, cycle % PNL_UPDATE_EVERY_N_CYCLES == 0).await;

        tokio::time::sleep(Duration::from_secs(settings.monitor_interval_s.max(1))).await;
    }
}

async fn run_cycle(state: &Arc<KernelState>, settings: &Settings, publish_pnl: bool) {
    let now_ist = kernel_clock::now_ist();
    let now_utc = Utc::now();
    let should_exit_eod = kernel_clock::should_force_eod_exit(now_ist);
    let circuit_emergency = state.circuit_breaker.read().is_open();

    let snapshot = state.market_cache.load();
    let mut open_unrealised = 0.0;

    for position in state.position_tracker.snapshot() {
        let Some(underlying) = snapshot.get(&position.symbol) else {
            continue;
        };
        let side = side_of(position.direction);
        let Some(leg) = underlying.option_chain.leg(position.strike, side) else {
            continue;
        };
        if !leg.is_plausible() {
            state.event_bus.publish(KernelEvent::data_quality(
                Some(position.symbol.clone()),
                format!("implausible quote for open position {}, skipped this cycle", position.position_id),
            ));
            continue;
        }
        let price = leg.ltp;
        let exit_market_context = MarketContext {
            spot: underlying.spot,
            iv: leg.implied_volatility,
            vix: snapshot.vix,
            pcr: underlying.option_chain.aggregates(underlying.spot).pcr,
        };

        let ctx = ExitContext {
            now: now_utc,
            should_exit_eod,
            reversal_signal_exceeds_threshold: state.reversal_detector.exceeds_threshold(&position, &snapshot),
            circuit_emergency_square_off: circuit_emergency,
        };

        match state.position_tracker.on_price_update(&position.position_id, price, ctx) {
            UpdateOutcome::Updated(updated) => {
                open_unrealised += updated.unrealised_pnl;
            }
            UpdateOutcome::PartialClose { position, reason, quantity_closed } => {
                open_unrealised += position.unrealised_pnl;
                settle_and_record(state, settings, &position, reason, quantity_closed, price, exit_market_context, now_utc).await;
                let _ = state.persistence.upsert_position(&position).await;
                state.event_bus.publish(KernelEvent::PositionUpdate {
                    position_id: position.position_id.clone(),
                    symbol: position.symbol.clone(),
                    state: "PARTIAL".to_string(),
                    unrealised_pnl: position.unrealised_pnl,
                });
            }
            UpdateOutcome::FullClose { position, reason, quantity_closed } => {
                settle_and_record(state, settings, &position, reason, quantity_closed, price, exit_market_context, now_utc).await;
                close_out(state, &position).await;
            }
            UpdateOutcome::Discarded => {}
        }
    }

    evaluate_circuit_triggers(state, settings, now_utc);

    if publish_pnl {
        let risk_state = state.risk_state.lock();
        state.event_bus.publish(KernelEvent::PnlUpdate {
            current_capital: risk_state.current_capital,
            daily_pnl: risk_state.daily_pnl,
            open_unrealised_pnl: open_unrealised,
        });
    }
}

/// Builds and settles the [`Trade`] for `quantity_closed` units of
/// `position`, records it against risk state, persists it, and publishes
/// `trade_closed`. Shared by both the partial (ladder rung) and full-close
/// paths; a ladder rung closes a slice of the position but is still a
/// complete, independently-settled trade (spec §4.10).
pub(crate) async fn settle_and_record(
    state: &Arc<KernelState>,
    settings: &Settings,
    position: &Position,
    reason: ExitReason,
    quantity_closed: u32,
    exit_price: f64,
    exit_market_context: MarketContext,
    now_utc: DateTime<Utc>,
) {
    if quantity_closed == 0 {
        return;
    }

    let schedule = IndianMarketsFeeSchedule::default();
    let (gross, fees, net) = pnl::settle(position.direction, position.entry_price, exit_price, quantity_closed, "NSE", &schedule);

    let trade = Trade {
        position_id: position.position_id.clone(),
        instrument_key: position.instrument_key.clone(),
        symbol: position.symbol.clone(),
        direction: position.direction,
        strike: position.strike,
        expiry: position.expiry,
        quantity: quantity_closed,
        entry_price: position.entry_price,
        entry_time: position.entry_time,
        strategy_id: position.strategy_id.clone(),
        market_context_entry: position.market_context_entry,
        vix_entry: position.vix_entry,
        exit_time: now_utc,
        exit_price,
        exit_reason: reason,
        gross_pnl: gross,
        fees,
        net_pnl: net,
        market_context_exit: exit_market_context,
        hold_duration_secs: (now_utc - position.entry_time).num_seconds(),
    };

    {
        let mut risk_state = state.risk_state.lock();
        let allocations = state.registry.read();
        let risk_manager = RiskManager::new(settings, &*allocations);
        risk_manager.record_trade(&mut risk_state, &trade);
    }

    if let Err(err) = state.persistence.insert_trade(&trade).await {
        warn!(error = %err, position_id = %position.position_id, "failed to persist closed trade");
    }
    state.event_bus.publish(KernelEvent::TradeClosed { trade: Box::new(trade) });
    info!(position_id = %position.position_id, ?reason, net_pnl = net, "trade settled");
}

/// Tears down everything that only applies once a position is fully gone:
/// unsubscribe from the tick feed, drop it from the instrument index, and
/// tell persistence it's closed.
pub(crate) async fn close_out(state: &Arc<KernelState>, position: &Position) {
    let order_manager = state.order_manager.read().clone();
    if let Err(err) = order_manager.on_position_closed(&position.instrument_key).await {
        warn!(error = %err, position_id = %position.position_id, "failed to unsubscribe closed position's instrument");
    }
    state.instrument_index.write().remove(&position.instrument_key);
    if let Err(err) = state.persistence.remove_position(&position.position_id).await {
        warn!(error = %err, position_id = %position.position_id, "failed to remove closed position from persistence");
    }
    state.event_bus.publish(KernelEvent::PositionUpdate {
        position_id: position.position_id.clone(),
        symbol: position.symbol.clone(),
        state: "CLOSED".to_string(),
        unrealised_pnl: 0.0,
    });
}

/// Spec §4.7 triggers evaluated every L3 cycle: daily loss and VIX spike
/// read directly off state already on hand; IV-shock samples the ATM call
/// of every configured underlying into a trailing 5-minute window
/// (`KernelState::iv_history`) and checks the relative move across it.
fn evaluate_circuit_triggers(state: &Arc<KernelState>, settings: &Settings, now_utc: DateTime<Utc>) {
    let snapshot = state.market_cache.load();
    let mut circuit = state.circuit_breaker.write();
    let was_open = circuit.is_open();

    {
        let risk_state = state.risk_state.lock();
        check_daily_loss(&mut circuit, &risk_state, settings, now_utc);
    }
    check_vix_spike(&mut circuit, snapshot.vix, settings, now_utc);

    for (name, underlying) in &snapshot.underlyings {
        let atm = underlying.option_chain.atm_strike(underlying.spot);
        let Some(leg) = underlying.option_chain.leg(atm, OptionSide::Call) else {
            continue;
        };
        let window = state.iv_history.push_and_window(
            name,
            IvSample { iv: leg.implied_volatility, observed_at: now_utc },
        );
        check_iv_shock(&mut circuit, &window, now_utc);
    }

    if circuit.is_open() && !was_open {
        state.event_bus.publish(KernelEvent::CircuitBreakerEvent { state: circuit.clone() });
        state.event_bus.publish(KernelEvent::alert(AlertLevel::Critical, "circuit breaker tripped", None));
    }
}
