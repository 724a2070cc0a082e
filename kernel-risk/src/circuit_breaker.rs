//! Circuit breaker trigger evaluation and latch management (spec §4.7).
//!
//! The latch itself ([`CircuitBreakerState`]) is plain data so it can be
//! persisted and survive a restart; this module is the only place that
//! decides when to flip it.

use chrono::{DateTime, Utc};
use kernel_common::circuit_state::{CircuitBreakerState, Latched, Trigger};
use kernel_common::risk_state::RiskState;
use kernel_common::Settings;

/// A single IV reading on a watched instrument, used to evaluate the IV
/// shock trigger over a trailing 5-minute window.
#[derive(Debug, Clone, Copy)]
pub struct IvSample {
    pub iv: f64,
    pub observed_at: DateTime<Utc>,
}

/// Raises the latch (additively — a new trigger joins whatever is already
/// active) and records `triggered_at` if this is the first trigger.
pub fn trip(state: &mut CircuitBreakerState, trigger: Trigger, now: DateTime<Utc>) {
    if state.triggered_at.is_none() {
        state.triggered_at = Some(now);
    }
    state.triggers_active.insert(trigger);
    state.latched = Latched::Open;
}

/// Daily-loss trigger (spec §4.7): `daily_pnl_pct <= -max_daily_loss_pct`.
pub fn check_daily_loss(state: &mut CircuitBreakerState, risk_state: &RiskState, settings: &Settings, now: DateTime<Utc>) {
    if risk_state.daily_pnl_pct() <= -settings.max_daily_loss_pct {
        trip(state, Trigger::DailyLoss, now);
    }
}

/// VIX-spike trigger: current VIX at or above `vix_halt_threshold`.
pub fn check_vix_spike(state: &mut CircuitBreakerState, vix: f64, settings: &Settings, now: DateTime<Utc>) {
    if vix >= settings.vix_halt_threshold {
        trip(state, Trigger::VixSpike, now);
    }
}

/// IV-shock trigger: `|delta IV| / IV >= 0.50` within a trailing 5-minute
/// window on any watched instrument. `window` is already filtered to
/// samples within that window by the caller.
pub fn check_iv_shock(state: &mut CircuitBreakerState, window: &[IvSample], now: DateTime<Utc>) {
    let Some((&first, &last)) = window.first().zip(window.last()) else {
        return;
    };
    if first.iv <= 0.0 {
        return;
    }
    let relative_move = (last.iv - first.iv).abs() / first.iv;
    if relative_move >= 0.50 {
        trip(state, Trigger::IvShock, now);
    }
}

/// Manual operator stop; the credential check happens at the caller
/// boundary (control surface), not here.
pub fn trip_manual(state: &mut CircuitBreakerState, now: DateTime<Utc>) {
    trip(state, Trigger::Manual, now);
    state.manual_override = true;
}

/// Raised when L3 crashes repeatedly (spec §4.12): never missing a
/// position's risk-monitoring budget matters more than staying open.
pub fn trip_monitor_loop_failure(state: &mut CircuitBreakerState, now: DateTime<Utc>) {
    trip(state, Trigger::MonitorLoopFailure, now);
}

/// Daily automatic reset at the pre-open tick (e.g. 09:00 IST): clears the
/// latch and trigger set unless a manual sticky override is set.
pub fn daily_reset(state: &mut CircuitBreakerState, now: DateTime<Utc>) {
    if state.manual_override {
        return;
    }
    state.latched = Latched::Closed;
    state.triggers_active.clear();
    state.triggered_at = None;
    state.daily_reset_timestamp = Some(now);
}

/// Manual reset requires the operator credential, checked by the caller
/// against the configured `emergency_credential` before this is invoked.
pub fn manual_reset(state: &mut CircuitBreakerState) {
    state.latched = Latched::Closed;
    state.triggers_active.clear();
    state.triggered_at = None;
    state.manual_override = false;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 28, 11, 0, 0).unwrap()
    }

    #[test]
    fn daily_loss_trips_the_latch() {
        let mut state = CircuitBreakerState::default();
        let mut risk_state = RiskState::new(100_000.0);
        risk_state.daily_pnl = -4_000.0;
        let settings = Settings::default();

        check_daily_loss(&mut state, &risk_state, &settings, now());
        assert!(state.is_open());
        assert!(state.triggers_active.contains(&Trigger::DailyLoss));
    }

    #[test]
    fn vix_spike_trips_the_latch() {
        let mut state = CircuitBreakerState::default();
        let settings = Settings::default();
        check_vix_spike(&mut state, 40.0, &settings, now());
        assert!(state.is_open());
    }

    #[test]
    fn sticky_manual_override_survives_daily_reset() {
        let mut state = CircuitBreakerState::default();
        trip_manual(&mut state, now());
        daily_reset(&mut state, now());
        assert!(state.is_open());
    }

    #[test]
    fn daily_reset_clears_a_non_sticky_latch() {
        let mut state = CircuitBreakerState::default();
        let settings = Settings::default();
        check_vix_spike(&mut state, 40.0, &settings, now());
        daily_reset(&mut state, now());
        assert!(!state.is_open());
        assert!(state.triggers_active.is_empty());
    }

    #[test]
    fn iv_shock_detects_a_fifty_percent_move() {
        let mut state = CircuitBreakerState::default();
        let window = vec![
            IvSample { iv: 0.15, observed_at: now() },
            IvSample { iv: 0.23, observed_at: now() },
        ];
        check_iv_shock(&mut state, &window, now());
        assert!(state.is_open());
    }
}
