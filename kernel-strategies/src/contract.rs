//! The strategy contract (spec §4.2).
//!
//! A strategy is a pure function of a [`StrategyContext`] to zero-or-more
//! [`Signal`]s. No I/O, no interior mutability that would make two calls on
//! the same snapshot observably different.

use chrono::DateTime;
use chrono_tz::Tz;
use kernel_common::snapshot::{MarketSnapshot, UnderlyingSnapshot};
use kernel_common::Signal;

/// Everything a strategy may read. All fields come from the single snapshot
/// an L2 cycle reads once and hands to every strategy (spec §4.12 ordering
/// guarantee); `previous` is the prior cycle's snapshot for the same
/// underlying, used by strategies that react to change rather than level.
pub struct StrategyContext<'a> {
    pub snapshot: &'a MarketSnapshot,
    pub underlying: &'a UnderlyingSnapshot,
    pub underlying_symbol: &'a str,
    pub previous: Option<&'a UnderlyingSnapshot>,
    /// IST wall-clock time of this L2 cycle (spec §4.1: every escaping
    /// timestamp is IST; strategies that reason about time-of-day need it
    /// in that zone, not UTC).
    pub now: DateTime<Tz>,
}

pub trait Strategy: Send + Sync {
    /// Canonical snake_case identifier; must match a registry entry.
    fn canonical_id(&self) -> &'static str;

    fn analyse(&self, ctx: &StrategyContext<'_>) -> Vec<Signal>;
}
