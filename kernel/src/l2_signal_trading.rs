//! (L2) Signal-trading loop (spec §4.12): reads one snapshot per cycle,
//! fans every enabled strategy out over it, scores and filters the
//! results, and asks risk to admit and size each survivor in turn.

use crate::persistence::PersistenceSink;
use crate::state::{KernelState, RecentSignal, SignalOutcome};
use chrono::Utc;
use kernel_common::constants::{DECISION_INTERVAL, STALE_THRESHOLD};
use kernel_common::signal::Signal;
use kernel_events::{AlertLevel, KernelEvent};
use kernel_risk::RiskManager;
use kernel_scoring::Scorer;
use kernel_strategies::contract::{Strategy, StrategyContext};
use std::sync::Arc;
use tracing::{info, warn};

/// Runs until shutdown. Suspended (sleeps without acting) outside market
/// hours, per spec §4.12.
pub async fn run(state: Arc<KernelState>) {
    loop {
        if state.is_shutting_down() {
            tracing::info!("L2 signal-trading loop stopping");
            return;
        }

        let now_ist = kernel_clock::now_ist();
        if !kernel_clock::is_market_hours(now_ist) {
            tokio::time::sleep(DECISION_INTERVAL).await;
            continue;
        }

        if state.is_paused() {
            tokio::time::sleep(DECISION_INTERVAL).await;
            continue;
        }

        if let Err(err) = run_cycle(&state, now_ist).await {
            warn!(error = %err, "L2 cycle failed");
            state.event_bus.publish(KernelEvent::alert(AlertLevel::Critical, "signal-trading cycle failed", Some(err.to_string())));
        }

        let settings = state.current_settings();
        tokio::time::sleep(std::time::Duration::from_secs(
            settings.refresh_interval_open_s.min(DECISION_INTERVAL.as_secs().max(1)),
        ))
        .await;
    }
}

#[derive(Debug, thiserror::Error)]
enum CycleError {
    #[error("no market snapshot available yet")]
    NoSnapshot,
}

async fn run_cycle(state: &Arc<KernelState>, now_ist: chrono::DateTime<chrono_tz::Tz>) -> Result<(), CycleError> {
    // Step 2: circuit breaker gate.
    if state.circuit_breaker.read().is_open() {
        return Ok(());
    }

    let snapshot = state.market_cache.load();
    if snapshot.underlyings.is_empty() {
        return Err(CycleError::NoSnapshot);
    }

    // Step 1 + 3: one snapshot per cycle, every enabled strategy fanned out
    // over each fresh underlying within it (a stale underlying is skipped,
    // not the whole cycle, so one laggy chain doesn't stall the others).
    let settings = state.current_settings();
    let registry_snapshot: Vec<(String, f64)> = {
        let registry = state.registry.read();
        registry.enabled_ids().map(|id| (id.to_string(), registry.allocation(id))).collect()
    };
    let strategies = kernel_strategies::all_builtin();

    let mut signals: Vec<Signal> = Vec::new();
    for (symbol, underlying_snapshot) in &snapshot.underlyings {
        if underlying_snapshot.age_secs(Utc::now()) as u64 > STALE_THRESHOLD.as_secs() {
            state.event_bus.publish(KernelEvent::data_quality(Some(symbol.clone()), "stale snapshot, cycle skipped for this underlying"));
            continue;
        }

        let owned_snapshot = Arc::clone(&snapshot);
        let owned_underlying = underlying_snapshot.clone();
        let symbol_owned = symbol.clone();

        let mut tasks = Vec::with_capacity(strategies.len());
        for strategy in &strategies {
            if !registry_snapshot.iter().any(|(id, _)| id == strategy.canonical_id()) {
                continue;
            }
            let owned_snapshot = Arc::clone(&owned_snapshot);
            let owned_underlying = owned_underlying.clone();
            let symbol_owned = symbol_owned.clone();
            let strategy_id = strategy.canonical_id();
            let strategies_ref = kernel_strategies::all_builtin();
            tasks.push(tokio::task::spawn_blocking(move || {
                let Some(strategy) = strategies_ref.into_iter().find(|s| s.canonical_id() == strategy_id) else {
                    return Vec::new();
                };
                let ctx = StrategyContext {
                    snapshot: &owned_snapshot,
                    underlying: &owned_underlying,
                    underlying_symbol: &symbol_owned,
                    previous: None,
                    now: now_ist,
                };
                strategy.analyse(&ctx)
            }));
        }

        for task in tasks {
            match task.await {
                Ok(mut produced) => signals.append(&mut produced),
                Err(join_err) => warn!(error = %join_err, "strategy task panicked, dropped"),
            }
        }
    }

    // Step 4: score, filter, dedupe, sort by composite (scorer is pure). No
    // ML model is wired in yet, so only `min_strategy_strength` gates
    // admission, per spec §4.5's pass-through rule.
    let scorer = Scorer::pass_through(settings.min_strategy_strength);
    let scored = scorer.score_and_filter(signals);

    // Step 5: admit, size, submit — in composite order.
    let allocations = state.registry.read();
    let risk_manager = RiskManager::new(&settings, &*allocations);

    for candidate in scored {
        let decision = {
            let risk_state = state.risk_state.lock();
            let circuit = state.circuit_breaker.read();
            risk_manager.can_take_trade(&candidate, &risk_state, &circuit, now_ist)
        };

        if !decision.is_admit() {
            state.recent_signals.push(RecentSignal {
                strategy_id: candidate.signal.strategy_id.clone(),
                symbol: candidate.signal.symbol.clone(),
                outcome: SignalOutcome::BlockedByRisk { reason: decision_reason(&decision) },
                at: Utc::now(),
            });
            continue;
        }

        let quantity = {
            let risk_state = state.risk_state.lock();
            risk_manager.size_position(&candidate, &risk_state)
        };
        if quantity == 0 {
            state.recent_signals.push(RecentSignal {
                strategy_id: candidate.signal.strategy_id.clone(),
                symbol: candidate.signal.symbol.clone(),
                outcome: SignalOutcome::BlockedByRisk { reason: "sizing floored to zero".to_string() },
                at: Utc::now(),
            });
            continue;
        }

        let lot = kernel_common::constants::lot_size(&candidate.signal.symbol);
        let order_manager = state.order_manager.read().clone();
        match order_manager
            .submit(&candidate, &candidate.signal.symbol, quantity, lot, snapshot.vix, Utc::now())
            .await
        {
            Ok(kernel_execution::SubmitOutcome::Filled(position)) => {
                let position_id = position.position_id.clone();
                let instrument_key = position.instrument_key.clone();
                let notional = position.notional();

                state.position_tracker.open(position.clone());
                state.instrument_index.write().insert(instrument_key, position_id.clone());
                {
                    let mut risk_state = state.risk_state.lock();
                    risk_manager.reserve_capital(&mut risk_state, &candidate.signal.strategy_id, notional);
                }
                let _ = state.persistence.upsert_position(&position).await;
                state.event_bus.publish(KernelEvent::PositionUpdate {
                    position_id: position_id.clone(),
                    symbol: position.symbol.clone(),
                    state: "OPEN".to_string(),
                    unrealised_pnl: 0.0,
                });
                state.recent_signals.push(RecentSignal {
                    strategy_id: candidate.signal.strategy_id.clone(),
                    symbol: candidate.signal.symbol.clone(),
                    outcome: SignalOutcome::Executed { position_id },
                    at: Utc::now(),
                });
                info!(strategy = %candidate.signal.strategy_id, symbol = %candidate.signal.symbol, quantity, "signal executed");
            }
            Ok(kernel_execution::SubmitOutcome::Pending(_pending)) => {
                // Live mode: the position materialises once L3 polls the
                // order to a fill; nothing more to do this cycle.
                state.recent_signals.push(RecentSignal {
                    strategy_id: candidate.signal.strategy_id.clone(),
                    symbol: candidate.signal.symbol.clone(),
                    outcome: SignalOutcome::Executed { position_id: "pending".to_string() },
                    at: Utc::now(),
                });
            }
            Err(err) => {
                state.recent_signals.push(RecentSignal {
                    strategy_id: candidate.signal.strategy_id.clone(),
                    symbol: candidate.signal.symbol.clone(),
                    outcome: SignalOutcome::ExecutionFailed { reason: err.to_string() },
                    at: Utc::now(),
                });
                warn!(error = %err, "order submission failed");
            }
        }
    }

    Ok(())
}

fn decision_reason(decision: &kernel_risk::Decision) -> String {
    match decision {
        kernel_risk::Decision::Admit => String::new(),
        kernel_risk::Decision::Reject(reason) => reason.to_string(),
    }
}
