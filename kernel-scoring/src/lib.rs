//! Signal scorer (spec §4.5): pure function from `Signal` to `ScoredSignal`,
//! attaching an ML probability behind a pluggable boundary, then filtering
//! and tie-breaking. No I/O, no state mutation.

use kernel_common::signal::{Direction, ScoredSignal, Signal};
use std::collections::HashMap;

/// The pluggable ML boundary. Inputs are the signal's Greeks and
/// market-context fields plus whatever engineered features the
/// implementation derives from them; output is a probability in `[0,1]`.
pub trait MlModel: Send + Sync {
    fn score(&self, signal: &Signal) -> f64;
}

/// Used when no model is loaded: probability is simply strength/100, and
/// only `min_strategy_strength` gates admission (spec §4.5).
pub struct PassThroughModel;

impl MlModel for PassThroughModel {
    fn score(&self, signal: &Signal) -> f64 {
        (signal.strength / 100.0).clamp(0.0, 1.0)
    }
}

pub struct Scorer {
    model: Option<Box<dyn MlModel>>,
    min_ml_score: f64,
    min_strategy_strength: f64,
}

impl Scorer {
    #[must_use]
    pub fn new(model: Option<Box<dyn MlModel>>, min_ml_score: f64, min_strategy_strength: f64) -> Self {
        Self {
            model,
            min_ml_score,
            min_strategy_strength,
        }
    }

    #[must_use]
    pub fn pass_through(min_strategy_strength: f64) -> Self {
        Self::new(None, 0.0, min_strategy_strength)
    }

    /// Scores every well-formed signal, drops malformed ones (spec §4.2 /
    /// §7 Domain error policy — the caller counts the drop per strategy),
    /// filters by the two thresholds, deduplicates same
    /// (symbol, strike, direction) keeping the highest composite, and
    /// returns the survivors sorted by composite descending.
    #[must_use]
    pub fn score_and_filter(&self, signals: Vec<Signal>) -> Vec<ScoredSignal> {
        let mut by_key: HashMap<(String, i64, Direction), ScoredSignal> = HashMap::new();

        for signal in signals.into_iter().filter(Signal::is_well_formed) {
            let ml_probability = match &self.model {
                Some(model) => model.score(&signal).clamp(0.0, 1.0),
                None => (signal.strength / 100.0).clamp(0.0, 1.0),
            };
            if self.model.is_some() && ml_probability < self.min_ml_score {
                continue;
            }
            if signal.strength < self.min_strategy_strength {
                continue;
            }

            let composite = composite_score(&signal, ml_probability);
            let key = (signal.symbol.clone(), strike_key(signal.strike), signal.direction);
            let candidate = ScoredSignal {
                signal,
                ml_probability,
                composite,
            };

            by_key
                .entry(key)
                .and_modify(|existing| {
                    if candidate.composite > existing.composite {
                        *existing = candidate.clone();
                    }
                })
                .or_insert(candidate);
        }

        let mut survivors: Vec<ScoredSignal> = by_key.into_values().collect();
        survivors.sort_by(|a, b| b.composite.partial_cmp(&a.composite).unwrap_or(std::cmp::Ordering::Equal));
        survivors
    }
}

fn strike_key(strike: f64) -> i64 {
    (strike * 100.0).round() as i64
}

fn composite_score(signal: &Signal, ml_probability: f64) -> f64 {
    let supporting_term = (f64::from(signal.supporting_factors) / 10.0).min(1.0);
    let rr_term = (signal.reward_risk_ratio() / 3.0).min(1.0);
    0.4 * ml_probability + 0.3 * (signal.strength / 100.0) + 0.2 * supporting_term + 0.1 * rr_term
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kernel_common::greeks::Greeks;
    use kernel_common::signal::MarketContext;

    fn sample_signal(strategy_id: &str, strike: f64, strength: f64) -> Signal {
        Signal {
            strategy_id: strategy_id.to_string(),
            symbol: "NIFTY".to_string(),
            direction: Direction::Call,
            strike,
            expiry: Utc::now(),
            entry_price: 100.0,
            target_price: 150.0,
            stop_loss: 70.0,
            ladder: None,
            strength,
            reason: "test".to_string(),
            greeks: Greeks {
                delta: 0.5,
                gamma: 0.01,
                theta: -1.0,
                vega: 1.0,
            },
            market_context: MarketContext {
                spot: 25000.0,
                iv: 0.15,
                vix: 14.0,
                pcr: 1.0,
            },
            produced_at: Utc::now(),
            supporting_factors: 3,
        }
    }

    #[test]
    fn pass_through_uses_strength_over_100_as_probability() {
        let scorer = Scorer::pass_through(40.0);
        let scored = scorer.score_and_filter(vec![sample_signal("pcr_analysis", 25000.0, 80.0)]);
        assert_eq!(scored.len(), 1);
        assert!((scored[0].ml_probability - 0.8).abs() < 1e-9);
    }

    #[test]
    fn below_strength_threshold_is_dropped() {
        let scorer = Scorer::pass_through(60.0);
        let scored = scorer.score_and_filter(vec![sample_signal("pcr_analysis", 25000.0, 40.0)]);
        assert!(scored.is_empty());
    }

    #[test]
    fn duplicate_strike_direction_keeps_highest_composite() {
        let scorer = Scorer::pass_through(0.0);
        let weak = sample_signal("pcr_analysis", 25000.0, 55.0);
        let strong = sample_signal("max_pain", 25000.0, 95.0);
        let scored = scorer.score_and_filter(vec![weak, strong]);
        assert_eq!(scored.len(), 1);
        assert_eq!(scored[0].signal.strategy_id, "max_pain");
    }

    #[test]
    fn zero_greeks_signal_is_dropped_as_malformed() {
        let mut malformed = sample_signal("pcr_analysis", 25000.0, 80.0);
        malformed.greeks = Greeks::zero();
        let scorer = Scorer::pass_through(0.0);
        assert!(scorer.score_and_filter(vec![malformed]).is_empty());
    }
}
