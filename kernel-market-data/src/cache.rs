//! Single-writer, multi-reader market-state cache (spec §4.3). The refresher
//! and tick router are the only writers; strategies, the risk manager and
//! the event bus only ever call [`MarketStateCache::load`].

use chrono::Utc;
use kernel_common::instrument::InstrumentKey;
use kernel_common::snapshot::MarketSnapshot;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Copy-on-write snapshot store. A reader that calls [`load`](Self::load)
/// never blocks on, or observes a partial update from, a concurrent
/// [`swap`](Self::swap): it gets the `Arc` that was current at the instant
/// of the call and keeps it alive for as long as it holds the clone.
pub struct MarketStateCache {
    current: RwLock<Arc<MarketSnapshot>>,
    /// Reverse index from broker instrument key to the underlying symbol it
    /// belongs to, so a push tick can be routed without scanning the whole
    /// snapshot (spec §4.3 "routes to the right strike/leg in O(1)").
    instrument_index: RwLock<FxHashMap<InstrumentKey, String>>,
}

impl MarketStateCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(MarketSnapshot::empty(Utc::now()))),
            instrument_index: RwLock::new(FxHashMap::default()),
        }
    }

    /// Cheap clone of the `Arc`; the caller owns a consistent point-in-time
    /// view regardless of subsequent writer activity.
    #[must_use]
    pub fn load(&self) -> Arc<MarketSnapshot> {
        self.current.read().clone()
    }

    /// Atomically replaces the snapshot. Called only from the refresher (a
    /// full rebuild) or the tick router (a derived copy-on-write update).
    pub fn swap(&self, next: Arc<MarketSnapshot>) {
        *self.current.write() = next;
    }

    /// Rebuilds the instrument-key -> underlying-symbol index. Called by the
    /// refresher whenever a chain's instrument universe changes (a new
    /// weekly expiry rolls in, or contracts are added/removed).
    pub fn reindex(&self, underlying_symbol: &str, keys: impl IntoIterator<Item = InstrumentKey>) {
        let mut index = self.instrument_index.write();
        index.retain(|_, sym| sym != underlying_symbol);
        for key in keys {
            index.insert(key, underlying_symbol.to_string());
        }
    }

    #[must_use]
    pub fn underlying_for(&self, key: &InstrumentKey) -> Option<String> {
        self.instrument_index.read().get(key).cloned()
    }
}

impl Default for MarketStateCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_cache_has_an_empty_snapshot() {
        let cache = MarketStateCache::new();
        assert!(cache.load().underlyings.is_empty());
    }

    #[test]
    fn swap_replaces_the_visible_snapshot() {
        let cache = MarketStateCache::new();
        let first = cache.load();
        let mut next = (*first).clone();
        next.vix = 22.5;
        cache.swap(Arc::new(next));

        assert!((cache.load().vix - 22.5).abs() < 1e-9);
        // the earlier clone the caller is still holding is unaffected
        assert!((first.vix - 0.0).abs() < 1e-9);
    }

    #[test]
    fn reindex_scopes_replacement_to_one_underlying() {
        let cache = MarketStateCache::new();
        cache.reindex("NIFTY", vec![InstrumentKey::new("NIFTY-25000-CE")]);
        cache.reindex("BANKNIFTY", vec![InstrumentKey::new("BANKNIFTY-50000-CE")]);

        assert_eq!(
            cache.underlying_for(&InstrumentKey::new("NIFTY-25000-CE")),
            Some("NIFTY".to_string())
        );

        cache.reindex("NIFTY", vec![InstrumentKey::new("NIFTY-25100-CE")]);
        assert!(cache.underlying_for(&InstrumentKey::new("NIFTY-25000-CE")).is_none());
        assert_eq!(
            cache.underlying_for(&InstrumentKey::new("BANKNIFTY-50000-CE")),
            Some("BANKNIFTY".to_string())
        );
    }
}
