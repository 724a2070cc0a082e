//! Reversal detector boundary (spec §4.9 exit rule 4): "a dedicated
//! detector" is named but never specified beyond "exceeds threshold". Kept
//! as a pluggable trait (SPEC_FULL §G dependency-injection redesign note)
//! so a real momentum/order-flow detector can be wired in without touching
//! the risk-monitoring loop.

use kernel_common::position::Position;
use kernel_common::snapshot::MarketSnapshot;

pub trait ReversalDetector: Send + Sync {
    /// Whether `position` should be closed on a reversal signal, given the
    /// current market snapshot.
    fn exceeds_threshold(&self, position: &Position, snapshot: &MarketSnapshot) -> bool;
}

/// Conservative default: never fires. A real detector (order-flow
/// imbalance flip, momentum exhaustion) is an enrichment left to the
/// deployment, not the core kernel contract.
#[derive(Debug, Default)]
pub struct NeverReverses;

impl ReversalDetector for NeverReverses {
    fn exceeds_threshold(&self, _position: &Position, _snapshot: &MarketSnapshot) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn default_detector_never_triggers() {
        let detector = NeverReverses;
        let snapshot = MarketSnapshot::empty(Utc::now());
        let position = crate::test_support::sample_position();
        assert!(!detector.exceeds_threshold(&position, &snapshot));
    }
}
