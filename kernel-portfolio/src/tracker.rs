//! Position tracker and exit semantics (spec §4.9).
//!
//! Keyed by position-id with per-key locking so two concurrent ticks for
//! the same instrument can never both trigger an exit (spec §5): a
//! [`dashmap::DashMap`] entry is held for the whole mark-and-evaluate
//! critical section, the same pattern `services/trading-gateway`'s
//! position manager uses for per-symbol position updates.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use kernel_common::position::{Position, PositionState};
use kernel_common::signal::Direction;
use kernel_common::trade::ExitReason;

/// Context the caller supplies beyond the raw price: everything exit
/// evaluation needs that isn't already on the `Position` (spec §4.9 rules
/// 3-5 depend on global state the tracker doesn't own).
#[derive(Debug, Clone, Copy)]
pub struct ExitContext {
    pub now: DateTime<Utc>,
    pub should_exit_eod: bool,
    pub reversal_signal_exceeds_threshold: bool,
    pub circuit_emergency_square_off: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// Price updated, no exit condition met.
    Updated(Position),
    /// A ladder rung closed part of the position; it remains OPEN/PARTIAL.
    PartialClose { position: Position, reason: ExitReason, quantity_closed: u32 },
    /// The position is now fully closed and has been removed from the
    /// tracker. `position` reflects its state at the moment of closure.
    FullClose { position: Position, reason: ExitReason, quantity_closed: u32 },
    /// The position-id is unknown, or the tick arrived after the position
    /// was already closed (spec §4.9: discarded, not an error).
    Discarded,
}

/// Resolves the direction-dependent sense of "winning" vs "losing" a price
/// move, per the long-only P&L convention in §4.10 (CALL profits as price
/// rises toward target; PUT profits as price falls toward target — see
/// `DESIGN.md` for why the exit trigger in §4.9 is read this way rather
/// than as a literal `<=`/`>=` pair that only holds for CALL).
fn reached_winning_side(direction: Direction, current: f64, threshold: f64) -> bool {
    match direction {
        Direction::Call => current >= threshold,
        Direction::Put => current <= threshold,
    }
}

fn reached_losing_side(direction: Direction, current: f64, threshold: f64) -> bool {
    match direction {
        Direction::Call => current <= threshold,
        Direction::Put => current >= threshold,
    }
}

/// Fraction of the original quantity the ladder has reached given the
/// current price: 0, 1/3, 2/3, or 1 depending on how many rungs are past
/// their winning side (spec §9 open question #2: equal one-third rungs).
fn ladder_target_fraction(direction: Direction, current: f64, ladder: kernel_common::signal::Ladder) -> f64 {
    let rungs = [ladder.t1, ladder.t2, ladder.t3];
    let reached = rungs.iter().filter(|&&rung| reached_winning_side(direction, current, rung)).count();
    reached as f64 / 3.0
}

pub struct PositionTracker {
    positions: DashMap<String, Position>,
}

impl PositionTracker {
    #[must_use]
    pub fn new() -> Self {
        Self { positions: DashMap::new() }
    }

    pub fn open(&self, position: Position) {
        self.positions.insert(position.position_id.clone(), position);
    }

    #[must_use]
    pub fn get(&self, position_id: &str) -> Option<Position> {
        self.positions.get(position_id).map(|p| p.clone())
    }

    /// A consistent read-only view of every open/partial position (spec §5:
    /// "read-only iteration produces a consistent view via a short snapshot
    /// copy"). Each entry is cloned under its own shard lock; this is not a
    /// single atomic snapshot of the whole map, matching the per-key (not
    /// whole-map) locking discipline the spec calls for.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Position> {
        self.positions.iter().map(|entry| entry.value().clone()).collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Applies a price update under the position's own lock: marks to
    /// market, then evaluates every exit condition in the order §4.9 lists
    /// them. A position that hits a ladder rung is partially closed and
    /// stays in the map as `PARTIAL`; one that fully closes is removed.
    pub fn on_price_update(&self, position_id: &str, price: f64, ctx: ExitContext) -> UpdateOutcome {
        let Some(mut entry) = self.positions.get_mut(position_id) else {
            return UpdateOutcome::Discarded;
        };
        if entry.state == PositionState::Closed {
            return UpdateOutcome::Discarded;
        }

        entry.mark_to_market(price);

        if let Some(outcome) = evaluate_exit(&mut entry, price, ctx) {
            return match outcome {
                Resolved::Partial { reason, quantity_closed } => {
                    UpdateOutcome::PartialClose { position: entry.clone(), reason, quantity_closed }
                }
                Resolved::Full { reason, quantity_closed } => {
                    let position = entry.clone();
                    drop(entry);
                    self.positions.remove(position_id);
                    tracing::info!(position_id, ?reason, quantity_closed, "position closed");
                    UpdateOutcome::FullClose { position, reason, quantity_closed }
                }
            };
        }

        UpdateOutcome::Updated(entry.clone())
    }

    /// Forces a close regardless of price (manual close-all, or a position
    /// the operator squares off directly). Removes the position and returns
    /// it; `None` if it was already gone.
    pub fn force_close(&self, position_id: &str) -> Option<Position> {
        self.positions.remove(position_id).map(|(_, p)| p)
    }
}

impl Default for PositionTracker {
    fn default() -> Self {
        Self::new()
    }
}

enum Resolved {
    Partial { reason: ExitReason, quantity_closed: u32 },
    Full { reason: ExitReason, quantity_closed: u32 },
}

/// Spec §4.9, checked in the order the spec lists them. Mutates `position`
/// in place for ladder bookkeeping (`ladder_closed_fraction`, `quantity`,
/// `state`) before returning what, if anything, the caller needs to settle.
fn evaluate_exit(position: &mut Position, price: f64, ctx: ExitContext) -> Option<Resolved> {
    // 1. Stop-loss.
    if reached_losing_side(position.direction, price, position.stop_loss) {
        let quantity_closed = position.quantity;
        let _ = position.transition_to(PositionState::Closed);
        return Some(Resolved::Full { reason: ExitReason::StopLoss, quantity_closed });
    }

    // 2. Target, with or without a ladder.
    if let Some(ladder) = position.ladder {
        let target_fraction = ladder_target_fraction(position.direction, price, ladder);
        if target_fraction > position.ladder_closed_fraction {
            let original_quantity = position.original_quantity;
            let already_closed = (f64::from(original_quantity) * position.ladder_closed_fraction).round() as u32;
            let total_closed_so_far = (f64::from(original_quantity) * target_fraction).round() as u32;
            let quantity_closed = total_closed_so_far.saturating_sub(already_closed).min(position.quantity);
            position.ladder_closed_fraction = target_fraction;

            if target_fraction >= 1.0 {
                position.quantity = position.quantity.saturating_sub(quantity_closed);
                let _ = position.transition_to(PositionState::Closed);
                return Some(Resolved::Full { reason: ExitReason::Target, quantity_closed });
            }

            position.quantity = position.quantity.saturating_sub(quantity_closed);
            let _ = position.transition_to(PositionState::Partial);
            return Some(Resolved::Partial { reason: ExitReason::Target, quantity_closed });
        }
    } else if reached_winning_side(position.direction, price, position.target_price) {
        let quantity_closed = position.quantity;
        let _ = position.transition_to(PositionState::Closed);
        return Some(Resolved::Full { reason: ExitReason::Target, quantity_closed });
    }

    // 3. Forced end-of-day square-off.
    if ctx.should_exit_eod {
        let quantity_closed = position.quantity;
        let _ = position.transition_to(PositionState::Closed);
        return Some(Resolved::Full { reason: ExitReason::Eod, quantity_closed });
    }

    // 4. Reversal detector.
    if ctx.reversal_signal_exceeds_threshold {
        let quantity_closed = position.quantity;
        let _ = position.transition_to(PositionState::Closed);
        return Some(Resolved::Full { reason: ExitReason::Reversal, quantity_closed });
    }

    // 5. Circuit breaker emergency square-off.
    if ctx.circuit_emergency_square_off {
        let quantity_closed = position.quantity;
        let _ = position.transition_to(PositionState::Closed);
        return Some(Resolved::Full { reason: ExitReason::Circuit, quantity_closed });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kernel_common::instrument::InstrumentKey;
    use kernel_common::signal::{Ladder, MarketContext};

    fn base_position(direction: Direction, entry: f64, stop: f64, target: f64, ladder: Option<Ladder>) -> Position {
        let now = Utc::now();
        Position {
            position_id: "POS-1".to_string(),
            signal_origin_strategy_id: "pcr_analysis".to_string(),
            instrument_key: InstrumentKey::new("NIFTY-25000-CE"),
            symbol: "NIFTY".to_string(),
            direction,
            strike: 25000.0,
            expiry: now,
            quantity: 75,
            original_quantity: 75,
            entry_price: entry,
            entry_time: now,
            current_price: entry,
            unrealised_pnl: 0.0,
            target_price: target,
            stop_loss: stop,
            ladder,
            state: PositionState::Open,
            strategy_id: "pcr_analysis".to_string(),
            market_context_entry: MarketContext { spot: 25000.0, iv: 0.15, vix: 14.0, pcr: 1.0 },
            vix_entry: 14.0,
            hour_entry: 10,
            minute_entry: 0,
            day_of_week_entry: 1,
            ladder_closed_fraction: 0.0,
        }
    }

    fn idle_ctx() -> ExitContext {
        ExitContext {
            now: Utc::now(),
            should_exit_eod: false,
            reversal_signal_exceeds_threshold: false,
            circuit_emergency_square_off: false,
        }
    }

    #[test]
    fn call_stoploss_closes_fully() {
        let tracker = PositionTracker::new();
        tracker.open(base_position(Direction::Call, 100.0, 80.0, 150.0, None));

        let outcome = tracker.on_price_update("POS-1", 79.0, idle_ctx());
        assert!(matches!(outcome, UpdateOutcome::FullClose { reason: ExitReason::StopLoss, quantity_closed: 75, .. }));
        assert!(tracker.get("POS-1").is_none());
    }

    #[test]
    fn put_stoploss_closes_on_price_rise_not_fall() {
        // PUT: target < entry < stop (spec §3), so the losing side is a
        // price *increase* back toward stop, not a decrease.
        let tracker = PositionTracker::new();
        tracker.open(base_position(Direction::Put, 100.0, 120.0, 70.0, None));

        assert!(matches!(
            tracker.on_price_update("POS-1", 90.0, idle_ctx()),
            UpdateOutcome::Updated(_)
        ));
        let outcome = tracker.on_price_update("POS-1", 121.0, idle_ctx());
        assert!(matches!(outcome, UpdateOutcome::FullClose { reason: ExitReason::StopLoss, .. }));
    }

    #[test]
    fn ticks_after_close_are_discarded() {
        let tracker = PositionTracker::new();
        tracker.open(base_position(Direction::Call, 100.0, 80.0, 150.0, None));
        tracker.on_price_update("POS-1", 79.0, idle_ctx());

        let outcome = tracker.on_price_update("POS-1", 200.0, idle_ctx());
        assert_eq!(outcome, UpdateOutcome::Discarded);
    }

    #[test]
    fn ladder_closes_one_third_at_each_rung() {
        let ladder = Ladder { t1: 120.0, t2: 140.0, t3: 160.0 };
        let tracker = PositionTracker::new();
        tracker.open(base_position(Direction::Call, 100.0, 80.0, 160.0, Some(ladder)));

        let first = tracker.on_price_update("POS-1", 121.0, idle_ctx());
        assert!(matches!(first, UpdateOutcome::PartialClose { reason: ExitReason::Target, quantity_closed: 25, .. }));
        assert_eq!(tracker.get("POS-1").unwrap().state, PositionState::Partial);
        assert_eq!(tracker.get("POS-1").unwrap().quantity, 50);

        let second = tracker.on_price_update("POS-1", 141.0, idle_ctx());
        assert!(matches!(second, UpdateOutcome::PartialClose { reason: ExitReason::Target, quantity_closed: 25, .. }));
        assert_eq!(tracker.get("POS-1").unwrap().quantity, 25);

        let third = tracker.on_price_update("POS-1", 161.0, idle_ctx());
        assert!(matches!(third, UpdateOutcome::FullClose { reason: ExitReason::Target, quantity_closed: 25, .. }));
        assert!(tracker.get("POS-1").is_none());
    }

    #[test]
    fn ladder_price_jumping_straight_to_t3_closes_everything_at_once() {
        let ladder = Ladder { t1: 120.0, t2: 140.0, t3: 160.0 };
        let tracker = PositionTracker::new();
        tracker.open(base_position(Direction::Call, 100.0, 80.0, 160.0, Some(ladder)));

        let outcome = tracker.on_price_update("POS-1", 200.0, idle_ctx());
        assert!(matches!(outcome, UpdateOutcome::FullClose { reason: ExitReason::Target, quantity_closed: 75, .. }));
    }

    #[test]
    fn eod_forces_exit_even_mid_range() {
        let tracker = PositionTracker::new();
        tracker.open(base_position(Direction::Call, 100.0, 80.0, 150.0, None));

        let mut ctx = idle_ctx();
        ctx.should_exit_eod = true;
        let outcome = tracker.on_price_update("POS-1", 110.0, ctx);
        assert!(matches!(outcome, UpdateOutcome::FullClose { reason: ExitReason::Eod, .. }));
    }

    #[test]
    fn circuit_emergency_square_off_closes_regardless_of_price() {
        let tracker = PositionTracker::new();
        tracker.open(base_position(Direction::Call, 100.0, 80.0, 150.0, None));

        let mut ctx = idle_ctx();
        ctx.circuit_emergency_square_off = true;
        let outcome = tracker.on_price_update("POS-1", 110.0, ctx);
        assert!(matches!(outcome, UpdateOutcome::FullClose { reason: ExitReason::Circuit, .. }));
    }

    #[test]
    fn unknown_position_id_is_discarded() {
        let tracker = PositionTracker::new();
        assert_eq!(tracker.on_price_update("NOPE", 100.0, idle_ctx()), UpdateOutcome::Discarded);
    }
}
