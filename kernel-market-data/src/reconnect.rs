//! Reconnect-with-backoff for the broker's streaming tick channel (spec §5:
//! "on disconnect, resubscribe the full instrument universe and back off
//! exponentially between attempts"). Generalised from the push-feed
//! reconnect loop into a reusable driver over any [`BrokerAdapter`].

use crate::broker::BrokerAdapter;
use kernel_common::instrument::InstrumentKey;
use kernel_common::Backoff;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

const RECONNECT_FLOOR: Duration = Duration::from_secs(1);
const RECONNECT_CEILING: Duration = Duration::from_secs(60);

/// Drives the subscribe -> consume-ticks -> (on drop) backoff-and-resubscribe
/// cycle until `shutdown` fires. Consumed ticks are forwarded to `on_tick`.
pub async fn run_with_reconnect(
    adapter: Arc<dyn BrokerAdapter>,
    universe: Vec<InstrumentKey>,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
    mut on_tick: impl FnMut(crate::broker::Tick),
) {
    let mut backoff = Backoff::new(RECONNECT_FLOOR, RECONNECT_CEILING);

    loop {
        if *shutdown.borrow() {
            return;
        }

        if let Err(err) = adapter.subscribe(&universe).await {
            warn!(error = %err, attempt = backoff.attempt(), "subscribe failed, backing off");
            tokio::select! {
                _ = tokio::time::sleep(backoff.next_delay()) => continue,
                _ = shutdown.changed() => return,
            }
        }
        backoff.reset();
        info!(count = universe.len(), "subscribed to instrument universe");

        let mut ticks = adapter.tick_receiver();
        loop {
            tokio::select! {
                received = ticks.recv() => {
                    match received {
                        Ok(tick) => on_tick(tick),
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "tick receiver lagged, dropping skipped ticks");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                            error!("tick channel closed, reconnecting");
                            break;
                        }
                    }
                }
                _ = shutdown.changed() => return,
            }
        }

        let delay = backoff.next_delay();
        warn!(?delay, attempt = backoff.attempt(), "stream disconnected, reconnecting");
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.changed() => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_starts_at_the_floor_and_caps_at_the_ceiling() {
        let mut backoff = Backoff::new(RECONNECT_FLOOR, RECONNECT_CEILING);
        assert_eq!(backoff.next_delay(), RECONNECT_FLOOR);
        for _ in 0..10 {
            backoff.next_delay();
        }
        assert_eq!(backoff.next_delay(), RECONNECT_CEILING);
    }
}
