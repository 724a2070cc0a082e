//! Rolling-window technical indicators computed from an underlying's spot
//! print series (spec §4.3: "returns, RSI, Bollinger, ATR, VWAP z-score").
//! Owned and mutated only by the market-data refresher (L1); never shared.

use kernel_common::snapshot::TechnicalIndicators;
use std::collections::VecDeque;

const RSI_PERIOD: usize = 14;
const BOLLINGER_PERIOD: usize = 20;
const ATR_PERIOD: usize = 14;
const VWAP_PERIOD: usize = 375; // one trading session at 1-minute sampling
const BOLLINGER_STD_MULTIPLIER: f64 = 2.0;

#[derive(Debug, Clone, Copy)]
struct Sample {
    price: f64,
    volume: u64,
}

#[derive(Debug, Clone, Default)]
pub struct RollingWindow {
    samples: VecDeque<Sample>,
}

impl RollingWindow {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, price: f64, volume: u64) {
        self.samples.push_back(Sample { price, volume });
        while self.samples.len() > VWAP_PERIOD {
            self.samples.pop_front();
        }
    }

    #[must_use]
    pub fn compute(&self) -> TechnicalIndicators {
        TechnicalIndicators {
            rsi_14: self.rsi(),
            bollinger_upper: self.bollinger().map(|(upper, _)| upper),
            bollinger_lower: self.bollinger().map(|(_, lower)| lower),
            atr_14: self.atr(),
            vwap_zscore: self.vwap_zscore(),
        }
    }

    fn prices(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.price).collect()
    }

    fn rsi(&self) -> Option<f64> {
        let prices = self.prices();
        if prices.len() <= RSI_PERIOD {
            return None;
        }
        let window = &prices[prices.len() - RSI_PERIOD - 1..];
        let mut gains = 0.0;
        let mut losses = 0.0;
        for pair in window.windows(2) {
            let change = pair[1] - pair[0];
            if change >= 0.0 {
                gains += change;
            } else {
                losses -= change;
            }
        }
        if gains + losses == 0.0 {
            return Some(50.0);
        }
        let avg_gain = gains / RSI_PERIOD as f64;
        let avg_loss = losses / RSI_PERIOD as f64;
        if avg_loss == 0.0 {
            return Some(100.0);
        }
        let rs = avg_gain / avg_loss;
        Some(100.0 - 100.0 / (1.0 + rs))
    }

    fn bollinger(&self) -> Option<(f64, f64)> {
        let prices = self.prices();
        if prices.len() < BOLLINGER_PERIOD {
            return None;
        }
        let window = &prices[prices.len() - BOLLINGER_PERIOD..];
        let mean = window.iter().sum::<f64>() / window.len() as f64;
        let variance = window.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / window.len() as f64;
        let std_dev = variance.sqrt();
        Some((mean + BOLLINGER_STD_MULTIPLIER * std_dev, mean - BOLLINGER_STD_MULTIPLIER * std_dev))
    }

    fn atr(&self) -> Option<f64> {
        let prices = self.prices();
        if prices.len() <= ATR_PERIOD {
            return None;
        }
        let window = &prices[prices.len() - ATR_PERIOD - 1..];
        let true_ranges: Vec<f64> = window.windows(2).map(|pair| (pair[1] - pair[0]).abs()).collect();
        Some(true_ranges.iter().sum::<f64>() / true_ranges.len() as f64)
    }

    fn vwap_zscore(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let total_volume: f64 = self.samples.iter().map(|s| s.volume as f64).sum();
        if total_volume <= 0.0 {
            return None;
        }
        let vwap = self.samples.iter().map(|s| s.price * s.volume as f64).sum::<f64>() / total_volume;

        let prices = self.prices();
        let mean = prices.iter().sum::<f64>() / prices.len() as f64;
        let variance = prices.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / prices.len() as f64;
        let std_dev = variance.sqrt();
        if std_dev <= 0.0 {
            return Some(0.0);
        }
        let last = prices.last().copied().unwrap_or(vwap);
        Some((last - vwap) / std_dev)
    }
}
