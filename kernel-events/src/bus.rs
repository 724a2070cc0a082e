//! Topic-keyed fan-out bus (spec §4.11), grounded in
//! `services/common/src/event_bus/bus.rs`'s `EventBus<T>` but collapsed onto
//! the fixed [`KernelEvent`] kind set rather than a generic `BusMessage`,
//! since the kernel has a closed, spec-enumerated set of message kinds
//! rather than an open plugin system.
//!
//! Each topic gets its own bounded [`tokio::sync::broadcast`] channel. A
//! slow subscriber never back-pressures publishers: once its buffer fills,
//! `broadcast` itself drops the oldest unread message and the next `recv()`
//! on that receiver returns `Lagged(n)` — exactly the "drop oldest once the
//! buffer exceeds a bounded high-water mark" policy spec §4.11 calls for.
//! [`Subscription::recv`] catches that and republishes a `data_quality`
//! alert before returning the next live message.

use crate::message::{KernelEvent, MessageEnvelope};
use crate::metrics::BusMetrics;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::warn;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy)]
pub struct EventBusConfig {
    /// Per-topic channel capacity; the high-water mark spec §4.11 requires.
    pub capacity: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self { capacity: 1024 }
    }
}

pub struct EventBus {
    config: EventBusConfig,
    broadcasters: DashMap<String, broadcast::Sender<MessageEnvelope>>,
    metrics: Arc<BusMetrics>,
}

impl EventBus {
    #[must_use]
    pub fn new(config: EventBusConfig) -> Self {
        Self { config, broadcasters: DashMap::new(), metrics: Arc::new(BusMetrics::new()) }
    }

    #[must_use]
    pub fn metrics(&self) -> Arc<BusMetrics> {
        Arc::clone(&self.metrics)
    }

    #[must_use]
    pub fn topics(&self) -> Vec<String> {
        self.broadcasters.iter().map(|entry| entry.key().clone()).collect()
    }

    #[must_use]
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.broadcasters.get(topic).map_or(0, |tx| tx.receiver_count())
    }

    fn sender_for(&self, topic: &str) -> broadcast::Sender<MessageEnvelope> {
        self.broadcasters
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.config.capacity).0)
            .clone()
    }

    /// Publishes an event, fanning it out to every current subscriber of its
    /// topic. Never blocks; a topic with no subscribers just counts as such
    /// (spec: delivery is best-effort).
    pub fn publish(&self, event: KernelEvent) -> MessageEnvelope {
        let envelope = MessageEnvelope::new(event);
        let topic = envelope.topic();
        let sender = self.sender_for(topic);

        match sender.send(envelope.clone()) {
            Ok(_subscriber_count) => self.metrics.record_publish(topic),
            Err(_) => self.metrics.record_no_subscribers(topic),
        }
        envelope
    }

    /// Subscribes to a single topic. `self` must be held behind an `Arc` so
    /// the subscription can republish `data_quality` alerts back onto the
    /// bus when it falls behind.
    #[must_use]
    pub fn subscribe(self: &Arc<Self>, topic: &str) -> Subscription {
        let receiver = self.sender_for(topic).subscribe();
        Subscription { topic: topic.to_string(), receiver, bus: Arc::clone(self) }
    }

    /// Runs the spec §4.11 heartbeat (every 30s) until `shutdown` fires.
    pub async fn run_heartbeat(self: Arc<Self>, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let mut sequence: u64 = 0;
        let mut ticker = tokio::time::interval(HEARTBEAT_INTERVAL);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    sequence += 1;
                    self.publish(KernelEvent::Heartbeat { sequence });
                }
                _ = shutdown.changed() => return,
            }
            if *shutdown.borrow() {
                return;
            }
        }
    }
}

pub struct Subscription {
    topic: String,
    receiver: broadcast::Receiver<MessageEnvelope>,
    bus: Arc<EventBus>,
}

impl Subscription {
    /// Awaits the next message on this topic. Returns `None` only once the
    /// bus itself has been dropped (every sender gone).
    pub async fn recv(&mut self) -> Option<MessageEnvelope> {
        loop {
            match self.receiver.recv().await {
                Ok(envelope) => return Some(envelope),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(topic = %self.topic, skipped, "subscriber lagged, oldest messages dropped");
                    self.bus.metrics.record_lagged(&self.topic, skipped);
                    self.bus.publish(KernelEvent::data_quality(
                        None,
                        format!("subscriber to '{}' dropped {skipped} message(s)", self.topic),
                    ));
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::AlertLevel;

    #[tokio::test]
    async fn publish_then_subscribe_delivers_in_order() {
        let bus = Arc::new(EventBus::new(EventBusConfig::default()));
        let mut sub = bus.subscribe("alert");

        bus.publish(KernelEvent::alert(AlertLevel::Info, "first", None));
        bus.publish(KernelEvent::alert(AlertLevel::Info, "second", None));

        let first = sub.recv().await.unwrap();
        let second = sub.recv().await.unwrap();
        assert!(matches!(first.event, KernelEvent::Alert { ref message, .. } if message == "first"));
        assert!(matches!(second.event, KernelEvent::Alert { ref message, .. } if message == "second"));
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_is_not_an_error() {
        let bus = Arc::new(EventBus::new(EventBusConfig::default()));
        bus.publish(KernelEvent::Heartbeat { sequence: 1 });
        assert_eq!(bus.metrics().no_subscribers_count("heartbeat"), 1);
    }

    #[tokio::test]
    async fn lagging_subscriber_sees_a_data_quality_alert() {
        let bus = Arc::new(EventBus::new(EventBusConfig { capacity: 2 }));
        let mut lagging = bus.subscribe("market_condition");
        let mut quality_watcher = bus.subscribe("data_quality");

        for i in 0..5 {
            bus.publish(KernelEvent::MarketCondition { symbol: "NIFTY".into(), regime: format!("regime-{i}"), vix: 14.0 });
        }

        // The lagging subscriber's next recv should surface the dropped
        // messages as a data_quality alert rather than erroring out.
        let _ = lagging.recv().await;
        let quality_event = quality_watcher.recv().await.unwrap();
        assert!(matches!(quality_event.event, KernelEvent::DataQuality { .. }));
    }

    #[tokio::test]
    async fn subscriber_count_reflects_active_subscriptions() {
        let bus = Arc::new(EventBus::new(EventBusConfig::default()));
        assert_eq!(bus.subscriber_count("connection"), 0);
        let _sub = bus.subscribe("connection");
        assert_eq!(bus.subscriber_count("connection"), 1);
    }
}
