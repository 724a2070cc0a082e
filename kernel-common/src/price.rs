//! Fixed-point price type.
//!
//! Prices and premiums are stored as i64 ticks (1 tick = 0.0001 rupee) so that
//! P&L arithmetic is reproducible bit-for-bit regardless of platform float
//! rounding (see the determinism requirement on the P&L calculator).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Neg, Sub};

const SCALE: i64 = 10_000;

/// A rupee-denominated price or premium, stored as fixed-point ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Px(i64);

impl Px {
    pub const ZERO: Self = Self(0);

    /// Build from a floating-point rupee amount (external API boundary only).
    #[must_use]
    pub fn from_rupees(value: f64) -> Self {
        Self((value * SCALE as f64).round() as i64)
    }

    /// Raw tick value.
    #[must_use]
    pub const fn ticks(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn from_ticks(ticks: i64) -> Self {
        Self(ticks)
    }

    /// Convert back to a float for display, serialisation to external
    /// systems, or strategy math that is not P&L-critical.
    #[must_use]
    pub fn as_f64(self) -> f64 {
        self.0 as f64 / SCALE as f64
    }

    #[must_use]
    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    #[must_use]
    pub const fn mul_qty(self, qty: i64) -> i64 {
        self.0 * qty
    }

    /// Round to 2 decimal places, matching the P&L calculator's rupee output.
    #[must_use]
    pub fn rounded_rupees(self) -> f64 {
        (self.as_f64() * 100.0).round() / 100.0
    }
}

impl Add for Px {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Px {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Neg for Px {
    type Output = Self;
    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl fmt::Display for Px {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.as_f64())
    }
}

impl From<f64> for Px {
    fn from(value: f64) -> Self {
        Self::from_rupees(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_float() {
        let p = Px::from_rupees(125.35);
        assert!((p.as_f64() - 125.35).abs() < 1e-9);
    }

    #[test]
    fn arithmetic_is_exact_in_ticks() {
        let a = Px::from_rupees(100.05);
        let b = Px::from_rupees(0.05);
        assert_eq!((a - b).as_f64(), 100.0);
    }

    #[test]
    fn rounds_to_two_decimals() {
        let p = Px::from_rupees(228.7469);
        assert_eq!(p.rounded_rupees(), 228.75);
    }
}
