//! First-order option Greeks (delta/gamma/theta/vega) as produced by a
//! Black-Scholes pricing engine; higher-order Greeks are out of scope.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Greeks {
    /// Price sensitivity to the underlying.
    pub delta: f64,
    /// Delta sensitivity to the underlying.
    pub gamma: f64,
    /// Time decay, per day.
    pub theta: f64,
    /// Sensitivity to implied volatility, per 1% vol point.
    pub vega: f64,
}

impl Greeks {
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            delta: 0.0,
            gamma: 0.0,
            theta: 0.0,
            vega: 0.0,
        }
    }

    /// A zero-filled Greeks snapshot is a strategy contract bug (spec §4.2);
    /// callers use this to detect it before a Signal escapes a strategy.
    #[must_use]
    pub fn is_all_zero(&self) -> bool {
        self.delta == 0.0 && self.gamma == 0.0 && self.theta == 0.0 && self.vega == 0.0
    }
}
