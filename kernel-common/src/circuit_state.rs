//! Circuit breaker latch state (spec §3, §4.7).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Latched {
    Closed,
    Open,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Trigger {
    DailyLoss,
    VixSpike,
    IvShock,
    Manual,
    /// §4.12: raised when L3 crashes repeatedly; never missing a position
    /// tick budget matters more than staying open.
    MonitorLoopFailure,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerState {
    pub latched: Latched,
    pub triggers_active: BTreeSet<Trigger>,
    pub triggered_at: Option<DateTime<Utc>>,
    pub manual_override: bool,
    pub daily_reset_timestamp: Option<DateTime<Utc>>,
}

impl Default for CircuitBreakerState {
    fn default() -> Self {
        Self {
            latched: Latched::Closed,
            triggers_active: BTreeSet::new(),
            triggered_at: None,
            manual_override: false,
            daily_reset_timestamp: None,
        }
    }
}

impl CircuitBreakerState {
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self.latched, Latched::Open)
    }
}
