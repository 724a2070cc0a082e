//! Token-bucket rate limiter enforcing the broker's request budgets (spec
//! §5: e.g. 10 req/s REST, 5 orders/s). Generalises the sliding-window
//! check the risk manager uses for its own order-rate gate.

use parking_lot::Mutex;
use std::time::{Duration, Instant};

pub struct TokenBucket {
    capacity: f64,
    tokens: Mutex<f64>,
    refill_per_sec: f64,
    last_refill: Mutex<Instant>,
}

impl TokenBucket {
    #[must_use]
    pub fn new(rate_per_sec: f64) -> Self {
        Self {
            capacity: rate_per_sec,
            tokens: Mutex::new(rate_per_sec),
            refill_per_sec: rate_per_sec,
            last_refill: Mutex::new(Instant::now()),
        }
    }

    fn refill(&self) {
        let mut last = self.last_refill.lock();
        let elapsed = last.elapsed();
        if elapsed > Duration::ZERO {
            let mut tokens = self.tokens.lock();
            *tokens = (*tokens + elapsed.as_secs_f64() * self.refill_per_sec).min(self.capacity);
            *last = Instant::now();
        }
    }

    /// Non-blocking: true and consumes one token if available, false
    /// otherwise. Callers apply their own backoff on `false` (spec §7:
    /// rate-limited errors back off per the rate limiter, never surfaced
    /// to the strategy layer).
    #[must_use]
    pub fn try_acquire(&self) -> bool {
        self.refill();
        let mut tokens = self.tokens.lock();
        if *tokens >= 1.0 {
            *tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Blocks (async) until a token is available.
    pub async fn acquire(&self) {
        loop {
            if self.try_acquire() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn acquire_blocks_until_a_token_refills() {
        let bucket = TokenBucket::new(50.0); // 50/s => one token every 20ms
        for _ in 0..50 {
            assert!(bucket.try_acquire());
        }
        assert!(!bucket.try_acquire());
        bucket.acquire().await;
    }
}
