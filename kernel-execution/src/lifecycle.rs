//! Order lifecycle state machine (spec §4.8: "NEW -> SUBMITTED -> (PARTIAL)
//! -> FILLED | REJECTED | CANCELLED").

use rustc_hash::FxHashMap;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderLifecycleState {
    New,
    Submitted,
    PartiallyFilled,
    Filled,
    Rejected,
    Cancelled,
}

impl OrderLifecycleState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Filled | Self::Rejected | Self::Cancelled)
    }
}

fn valid_transitions() -> &'static FxHashMap<OrderLifecycleState, Vec<OrderLifecycleState>> {
    static TABLE: OnceLock<FxHashMap<OrderLifecycleState, Vec<OrderLifecycleState>>> = OnceLock::new();
    TABLE.get_or_init(|| {
        use OrderLifecycleState::{Cancelled, Filled, New, PartiallyFilled, Rejected, Submitted};
        let mut table = FxHashMap::default();
        table.insert(New, vec![Submitted, Rejected, Cancelled]);
        table.insert(Submitted, vec![PartiallyFilled, Filled, Cancelled, Rejected]);
        table.insert(PartiallyFilled, vec![Filled, Cancelled]);
        table.insert(Filled, vec![]);
        table.insert(Rejected, vec![]);
        table.insert(Cancelled, vec![]);
        table
    })
}

/// Whether `from -> to` is a legal lifecycle transition.
#[must_use]
pub fn can_transition(from: OrderLifecycleState, to: OrderLifecycleState) -> bool {
    valid_transitions()
        .get(&from)
        .is_some_and(|allowed| allowed.contains(&to))
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderLifecycleState::{Cancelled, Filled, New, PartiallyFilled, Rejected, Submitted};

    #[test]
    fn new_can_only_advance_forward() {
        assert!(can_transition(New, Submitted));
        assert!(!can_transition(New, Filled));
    }

    #[test]
    fn terminal_states_accept_nothing() {
        assert!(!can_transition(Filled, Cancelled));
        assert!(!can_transition(Rejected, Submitted));
        assert!(!can_transition(Cancelled, New));
    }

    #[test]
    fn partial_fill_must_resolve_to_filled_or_cancelled() {
        assert!(can_transition(PartiallyFilled, Filled));
        assert!(can_transition(PartiallyFilled, Cancelled));
        assert!(!can_transition(PartiallyFilled, Rejected));
    }
}
