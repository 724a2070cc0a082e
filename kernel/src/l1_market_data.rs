//! (L1) Market-data loop (spec §4.12): periodic REST refresh plus the
//! push-tick stream, running as two cooperating tasks under one supervised
//! loop entry point so a crash in either restarts both together.

use crate::l3_risk_monitoring::{close_out, settle_and_record, side_of};
use crate::persistence::PersistenceSink;
use crate::state::KernelState;
use kernel_common::constants::{REFRESH_INTERVAL_IDLE, REFRESH_INTERVAL_OPEN, REFRESH_INTERVAL_VIX_SPIKE, VIX_SPIKE_REFRESH_THRESHOLD};
use kernel_common::signal::MarketContext;
use kernel_events::{AlertLevel, KernelEvent};
use kernel_market_data::broker::Tick;
use kernel_market_data::refresh::{refresh_cycle, RefreshState};
use kernel_market_data::BrokerAdapter;
use kernel_portfolio::tracker::{ExitContext, UpdateOutcome};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Chooses the refresh cadence (spec §4.12 L1): 30s with any position open,
/// 60s idle, 20s whenever VIX has spiked — VIX takes priority over either.
fn refresh_interval(state: &KernelState, settings: &kernel_common::config::Settings) -> Duration {
    let vix = state.market_cache.load().vix;
    if vix >= VIX_SPIKE_REFRESH_THRESHOLD {
        return REFRESH_INTERVAL_VIX_SPIKE;
    }
    if state.position_tracker.is_empty() {
        Duration::from_secs(settings.refresh_interval_idle_s).max(REFRESH_INTERVAL_IDLE / 2)
    } else {
        Duration::from_secs(settings.refresh_interval_open_s).max(REFRESH_INTERVAL_OPEN / 2)
    }
}

/// Runs until `state.shutting_down` is observed between iterations. Emits a
/// `market_condition` event whenever the VIX-spike regime flips.
pub async fn run(state: Arc<KernelState>) {
    let mut refresh_state = RefreshState::new();
    let mut was_spiking = false;

    loop {
        if state.is_shutting_down() {
            info!("L1 market-data loop stopping");
            return;
        }

        let settings = state.current_settings();
        match refresh_cycle(
            state.broker.as_ref(),
            &state.market_cache,
            &mut refresh_state,
            &state.underlyings,
            &state.vix_instrument_key,
        )
        .await
        {
            Ok(()) => {
                let snapshot = state.market_cache.load();
                let is_spiking = snapshot.is_vix_spiking(settings.vix_halt_threshold.min(VIX_SPIKE_REFRESH_THRESHOLD));
                if is_spiking != was_spiking {
                    was_spiking = is_spiking;
                    state.event_bus.publish(KernelEvent::MarketCondition {
                        symbol: "VIX".to_string(),
                        regime: if is_spiking { "volatile".to_string() } else { "normal".to_string() },
                        vix: snapshot.vix,
                    });
                }
            }
            Err(err) => {
                warn!(error = %err, "L1 refresh cycle failed, keeping previous snapshot");
                state.event_bus.publish(KernelEvent::alert(AlertLevel::Warning, "market data refresh failed", Some(err.to_string())));
            }
        }

        tokio::time::sleep(refresh_interval(&state, &settings)).await;
    }
}

/// Drives the push-tick stream into the cache and, for any instrument that
/// belongs to an open position, into the position tracker via the
/// instrument index (spec §4.8 "subscribes ... and routes every tick into
/// the position tracker"; spec §4.9 "push tick preferred" over the periodic
/// L3 re-mark).
pub async fn run_tick_router(state: Arc<KernelState>, mut shutdown: tokio::sync::watch::Receiver<bool>) {
    let universe = state.underlyings.clone();
    let _ = universe; // the subscribed universe is the union of base watch-list and open positions; reconnect resubscribes it on demand.
    let mut ticks = state.broker.tick_receiver();

    loop {
        tokio::select! {
            received = ticks.recv() => {
                match received {
                    Ok(tick) => {
                        if kernel_market_data::apply_tick(&state.market_cache, &tick) {
                            route_tick_to_position(&state, &tick).await;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "tick router lagged, oldest ticks dropped");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        warn!("tick stream closed, tick router exiting");
                        return;
                    }
                }
            }
            _ = shutdown.changed() => return,
        }
        if state.is_shutting_down() {
            return;
        }
    }
}

/// Looks `tick.instrument_key` up in the instrument index; if it names an
/// open position, re-marks that position immediately against the tick's
/// price instead of waiting for L3's next polling cycle, and settles any
/// exit the tick triggers exactly as L3 would (spec §4.9: ticks are the
/// preferred source of a position's current price).
async fn route_tick_to_position(state: &Arc<KernelState>, tick: &Tick) {
    let Some(position_id) = state.instrument_index.read().get(&tick.instrument_key).cloned() else {
        return;
    };
    let Some(position) = state.position_tracker.get(&position_id) else {
        return;
    };

    let now_ist = kernel_clock::now_ist();
    let now_utc = chrono::Utc::now();
    let should_exit_eod = kernel_clock::should_force_eod_exit(now_ist);
    let circuit_emergency = state.circuit_breaker.read().is_open();

    let snapshot = state.market_cache.load();
    let Some(underlying) = snapshot.get(&position.symbol) else {
        return;
    };
    let side = side_of(position.direction);
    let iv = underlying.option_chain.leg(position.strike, side).map_or(0.0, |leg| leg.implied_volatility);
    let exit_market_context = MarketContext {
        spot: underlying.spot,
        iv,
        vix: snapshot.vix,
        pcr: underlying.option_chain.aggregates(underlying.spot).pcr,
    };

    let ctx = ExitContext {
        now: now_utc,
        should_exit_eod,
        reversal_signal_exceeds_threshold: state.reversal_detector.exceeds_threshold(&position, &snapshot),
        circuit_emergency_square_off: circuit_emergency,
    };

    let settings = state.current_settings();
    match state.position_tracker.on_price_update(&position_id, tick.ltp, ctx) {
        UpdateOutcome::Updated(updated) => {
            state.event_bus.publish(KernelEvent::PositionUpdate {
                position_id: updated.position_id.clone(),
                symbol: updated.symbol.clone(),
                state: "OPEN".to_string(),
                unrealised_pnl: updated.unrealised_pnl,
            });
        }
        UpdateOutcome::PartialClose { position, reason, quantity_closed } => {
            settle_and_record(state, &settings, &position, reason, quantity_closed, tick.ltp, exit_market_context, now_utc).await;
            let _ = state.persistence.upsert_position(&position).await;
            state.event_bus.publish(KernelEvent::PositionUpdate {
                position_id: position.position_id.clone(),
                symbol: position.symbol.clone(),
                state: "PARTIAL".to_string(),
                unrealised_pnl: position.unrealised_pnl,
            });
        }
        UpdateOutcome::FullClose { position, reason, quantity_closed } => {
            settle_and_record(state, &settings, &position, reason, quantity_closed, tick.ltp, exit_market_context, now_utc).await;
            close_out(state, &position).await;
        }
        UpdateOutcome::Discarded => {}
    }
}
