//! Control surface (spec §6 "Control surface (inbound)"). The dashboard and
//! any other operator-facing front end are out of scope (spec §1); this
//! module is the whole of the inbound contract they'd call through, kept
//! here as plain async functions over [`KernelState`] rather than a network
//! handler, since the transport (HTTP, gRPC, CLI) is an external concern.

use crate::config::ConfigError;
use crate::l3_risk_monitoring::{close_out, settle_and_record};
use crate::state::KernelState;
use kernel_common::config::{Settings, TradingMode};
use kernel_common::errors::KernelError;
use kernel_common::signal::MarketContext;
use kernel_common::trade::ExitReason;
use kernel_events::{AlertLevel, KernelEvent};
use kernel_execution::OrderManager;
use kernel_risk::circuit_breaker::{manual_reset, trip_manual};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

fn check_credential(state: &KernelState, credential: &str) -> Result<(), KernelError> {
    let settings = state.current_settings();
    if settings.emergency_credential.is_empty() || settings.emergency_credential != credential {
        return Err(KernelError::Authentication("invalid operator credential".to_string()));
    }
    Ok(())
}

/// `start`: a no-op at this layer — the binary's `main` spawns the three
/// loops once at process start. Kept as a named entry point so a future
/// control transport has something to call without reaching into `main`.
pub fn start(state: &Arc<KernelState>) {
    state.paused.store(false, Ordering::SeqCst);
    state.shutting_down.store(false, Ordering::SeqCst);
    state.event_bus.publish(KernelEvent::SystemStatus { status: "started".to_string(), detail: None });
}

/// `stop`: cooperative shutdown (spec §4.12, §5). L2 stops admitting new
/// signals immediately (`shutting_down` is checked at the top of its loop);
/// L3 keeps marking and exiting existing positions until they're gone or
/// the operator calls [`close_all`]; L1 stops last because the other two
/// loops still read the cache while winding down.
pub fn stop(state: &Arc<KernelState>) {
    state.shutting_down.store(true, Ordering::SeqCst);
    state.event_bus.publish(KernelEvent::SystemStatus { status: "stopping".to_string(), detail: None });
}

/// `pause`: L2 stops admitting new signals; L1 and L3 keep running so open
/// positions stay marked and managed.
pub fn pause(state: &Arc<KernelState>) {
    state.paused.store(true, Ordering::SeqCst);
    state.event_bus.publish(KernelEvent::SystemStatus { status: "paused".to_string(), detail: None });
}

pub fn resume(state: &Arc<KernelState>) {
    state.paused.store(false, Ordering::SeqCst);
    state.event_bus.publish(KernelEvent::SystemStatus { status: "resumed".to_string(), detail: None });
}

/// `set_mode(paper|live)`: idempotent. Rebuilding the order manager clears
/// its in-flight subscription bookkeeping (spec §6) without touching
/// [`KernelState::position_tracker`] or any open position, since the order
/// manager never owned that state to begin with.
pub fn set_mode(state: &Arc<KernelState>, mode: TradingMode) {
    let mut guard = state.order_manager.write();
    if guard.mode() == mode {
        return;
    }
    *guard = Arc::new(OrderManager::new(Arc::clone(&state.broker), mode));
    drop(guard);
    state.event_bus.publish(KernelEvent::SystemStatus { status: "mode_changed".to_string(), detail: Some(format!("{mode:?}")) });
}

/// `emergency_stop(reason, credential)`: latches the circuit breaker OPEN
/// with the manual trigger and marks it sticky, so the daily automatic
/// reset (spec §4.7) does not silently clear an operator-initiated halt.
pub fn emergency_stop(state: &Arc<KernelState>, reason: &str, credential: &str) -> Result<(), KernelError> {
    check_credential(state, credential)?;
    let now = chrono::Utc::now();
    let mut circuit = state.circuit_breaker.write();
    trip_manual(&mut circuit, now);
    drop(circuit);
    warn!(reason, "emergency stop latched by operator");
    state.event_bus.publish(KernelEvent::CircuitBreakerEvent { state: state.circuit_breaker.read().clone() });
    state.event_bus.publish(KernelEvent::alert(AlertLevel::Critical, "emergency stop", Some(reason.to_string())));
    Ok(())
}

/// Clears a manual (or any other) latch. Requires the same credential as
/// [`emergency_stop`]; the daily automatic reset path (§4.7) does not call
/// this — it runs `kernel_risk::circuit_breaker::daily_reset` directly.
pub fn reset_circuit_breaker(state: &Arc<KernelState>, credential: &str) -> Result<(), KernelError> {
    check_credential(state, credential)?;
    let mut circuit = state.circuit_breaker.write();
    manual_reset(&mut circuit);
    drop(circuit);
    state.event_bus.publish(KernelEvent::CircuitBreakerEvent { state: state.circuit_breaker.read().clone() });
    Ok(())
}

/// `close_all(reason, credential)`: force-closes every OPEN/PARTIAL
/// position at its last marked price with exit-reason `MANUAL`, settling
/// and persisting each the same way a triggered exit would in L3. Returns
/// the number of positions closed.
pub async fn close_all(state: &Arc<KernelState>, reason: &str, credential: &str) -> Result<usize, KernelError> {
    check_credential(state, credential)?;
    let settings = state.current_settings();
    let now = chrono::Utc::now();
    let snapshot = state.market_cache.load();

    let mut closed = 0usize;
    for position in state.position_tracker.snapshot() {
        let Some(forced) = state.position_tracker.force_close(&position.position_id) else {
            continue;
        };
        let quantity_closed = forced.quantity;
        let exit_price = forced.current_price;
        let exit_context = snapshot
            .get(&forced.symbol)
            .map(|u| MarketContext { spot: u.spot, iv: forced.market_context_entry.iv, vix: snapshot.vix, pcr: u.option_chain.aggregates(u.spot).pcr })
            .unwrap_or(forced.market_context_entry);

        settle_and_record(state, &settings, &forced, ExitReason::Manual, quantity_closed, exit_price, exit_context, now).await;
        close_out(state, &forced).await;
        closed += 1;
    }

    info!(reason, closed, "close_all executed by operator");
    state.event_bus.publish(KernelEvent::alert(AlertLevel::Warning, "close_all executed", Some(reason.to_string())));
    Ok(closed)
}

/// `update_settings(...)`: validated against the spec §6 closed ranges,
/// then swapped in wholesale under a short write lock. The new settings
/// take effect "atomically at the next L2 cycle" simply because L2 re-reads
/// `state.current_settings()` once per cycle rather than caching it.
pub fn update_settings(state: &Arc<KernelState>, candidate: Settings) -> Result<(), ConfigError> {
    candidate.validate()?;
    *state.settings.write() = Arc::new(candidate);
    state.event_bus.publish(KernelEvent::SystemStatus { status: "settings_updated".to_string(), detail: None });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_kernel_state;

    #[test]
    fn emergency_stop_rejects_wrong_credential() {
        let state = test_kernel_state();
        let err = emergency_stop(&state, "fire", "wrong").unwrap_err();
        assert!(matches!(err, KernelError::Authentication(_)));
        assert!(!state.circuit_breaker.read().is_open());
    }

    #[test]
    fn emergency_stop_latches_with_correct_credential() {
        let state = test_kernel_state();
        emergency_stop(&state, "fire", "test-credential").expect("latch");
        assert!(state.circuit_breaker.read().is_open());
    }

    #[test]
    fn pause_and_resume_toggle_the_flag() {
        let state = test_kernel_state();
        pause(&state);
        assert!(state.is_paused());
        resume(&state);
        assert!(!state.is_paused());
    }

    #[test]
    fn update_settings_rejects_out_of_range_values() {
        let state = test_kernel_state();
        let mut candidate = (*state.current_settings()).clone();
        candidate.max_daily_loss_pct = 999.0;
        assert!(update_settings(&state, candidate).is_err());
    }

    #[test]
    fn update_settings_applies_a_valid_change() {
        let state = test_kernel_state();
        let mut candidate = (*state.current_settings()).clone();
        candidate.max_positions = 5;
        update_settings(&state, candidate).expect("valid update");
        assert_eq!(state.current_settings().max_positions, 5);
    }

    #[tokio::test]
    async fn close_all_requires_credential() {
        let state = test_kernel_state();
        let err = close_all(&state, "test", "wrong").await.unwrap_err();
        assert!(matches!(err, KernelError::Authentication(_)));
    }

    #[tokio::test]
    async fn close_all_closes_every_open_position() {
        let state = test_kernel_state();
        state.position_tracker.open(crate::test_support::sample_position());
        let closed = close_all(&state, "operator request", "test-credential").await.expect("close_all");
        assert_eq!(closed, 1);
        assert!(state.position_tracker.is_empty());
    }
}
