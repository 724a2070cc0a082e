//! Per-topic publish/drop counters (spec SPEC_FULL §G), grounded in
//! `services/common/src/event_bus/metrics.rs`'s `BusMetrics` but collapsed
//! onto `DashMap` rather than a hand-rolled read-then-upgrade lock dance.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct BusMetrics {
    published: DashMap<String, AtomicU64>,
    no_subscribers: DashMap<String, AtomicU64>,
    lagged: DashMap<String, AtomicU64>,
}

impl BusMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_publish(&self, topic: &str) {
        increment(&self.published, topic);
    }

    pub fn record_no_subscribers(&self, topic: &str) {
        increment(&self.no_subscribers, topic);
    }

    pub fn record_lagged(&self, topic: &str, skipped: u64) {
        self.lagged.entry(topic.to_string()).or_insert_with(|| AtomicU64::new(0)).fetch_add(skipped, Ordering::Relaxed);
    }

    #[must_use]
    pub fn published_count(&self, topic: &str) -> u64 {
        self.published.get(topic).map_or(0, |c| c.load(Ordering::Relaxed))
    }

    #[must_use]
    pub fn no_subscribers_count(&self, topic: &str) -> u64 {
        self.no_subscribers.get(topic).map_or(0, |c| c.load(Ordering::Relaxed))
    }

    #[must_use]
    pub fn lagged_count(&self, topic: &str) -> u64 {
        self.lagged.get(topic).map_or(0, |c| c.load(Ordering::Relaxed))
    }
}

fn increment(map: &DashMap<String, AtomicU64>, topic: &str) {
    map.entry(topic.to_string()).or_insert_with(|| AtomicU64::new(0)).fetch_add(1, Ordering::Relaxed);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_per_topic() {
        let metrics = BusMetrics::new();
        metrics.record_publish("heartbeat");
        metrics.record_publish("heartbeat");
        metrics.record_no_subscribers("alert");
        metrics.record_lagged("position_update", 3);

        assert_eq!(metrics.published_count("heartbeat"), 2);
        assert_eq!(metrics.no_subscribers_count("alert"), 1);
        assert_eq!(metrics.lagged_count("position_update"), 3);
        assert_eq!(metrics.published_count("unknown_topic"), 0);
    }
}
