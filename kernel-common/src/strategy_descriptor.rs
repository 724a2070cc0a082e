//! Strategy registry entries (spec §4.2, §4.4).

use serde::{Deserialize, Serialize};

/// Canonical, lowercase snake_case strategy identifier.
pub type CanonicalId = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyDescriptor {
    pub canonical_id: CanonicalId,
    pub human_name: String,
    /// 0-100.
    pub weight: f64,
    /// 0-1.
    pub default_allocation_fraction: f64,
    pub enabled: bool,
}

/// Fallback identity for names that fail to normalise (spec §4.4).
pub const UNKNOWN_STRATEGY_ID: &str = "unknown";
/// The `unknown` bucket carries the lowest default allocation, so a
/// misnormalised strategy can never out-compete a registered one for capital.
pub const UNKNOWN_ALLOCATION_FRACTION: f64 = 0.01;

/// Lets the risk manager look up a canonical strategy's capital allocation
/// fraction without depending on the strategy-registry crate directly; the
/// registry is the sole implementer (spec §4.4, §4.6).
pub trait AllocationSource: Send + Sync {
    fn allocation(&self, canonical_id: &str) -> f64;
}
