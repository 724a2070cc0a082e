//! The closed configuration set (spec §6), with the range validation spec
//! §6/§7 requires before `update_settings` is allowed to apply a change.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradingMode {
    Paper,
    Live,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub starting_capital: f64,
    pub max_daily_loss_pct: f64,
    pub per_trade_risk_pct: f64,
    pub max_positions: u32,
    pub max_trades_per_day: u32,
    pub aggressive_mode: bool,
    pub min_ml_score: f64,
    pub min_strategy_strength: f64,
    pub refresh_interval_open_s: u64,
    pub refresh_interval_idle_s: u64,
    pub monitor_interval_s: u64,
    pub vix_halt_threshold: f64,
    pub emergency_credential: String,
    pub trading_mode: TradingMode,
    /// Upper bound on capital committed across all open positions, as a
    /// fraction of starting capital (spec invariant 1 / 2).
    pub max_capital_fraction: f64,
    /// Upper bound on the *risk fraction* itself after the aggressive-mode
    /// boost (spec §4.6: "up to a hard cap of 3% of capital").
    pub hard_cap_capital_fraction: f64,
    /// Upper bound on premium outlay for a single trade, as a fraction of
    /// starting capital (spec §4.6's separate "per-trade-capital cap": the
    /// premium a long option costs is not the same number as the capital
    /// put at risk to the stop-loss, so this is deliberately a larger
    /// fraction than `hard_cap_capital_fraction` — see `DESIGN.md`).
    pub per_trade_capital_fraction: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            starting_capital: 100_000.0,
            max_daily_loss_pct: 3.0,
            per_trade_risk_pct: 2.0,
            max_positions: 20,
            max_trades_per_day: 50,
            aggressive_mode: false,
            min_ml_score: 0.6,
            min_strategy_strength: 50.0,
            refresh_interval_open_s: 30,
            refresh_interval_idle_s: 60,
            monitor_interval_s: 2,
            vix_halt_threshold: 35.0,
            emergency_credential: String::new(),
            trading_mode: TradingMode::Paper,
            max_capital_fraction: 0.8,
            hard_cap_capital_fraction: 0.03,
            per_trade_capital_fraction: 0.10,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("{field} must be in range {range}, got {value}")]
    OutOfRange {
        field: &'static str,
        range: &'static str,
        value: f64,
    },
}

impl Settings {
    /// Validate against the closed ranges in spec §6. Called before
    /// `update_settings` swaps the live settings pointer.
    pub fn validate(&self) -> Result<(), SettingsError> {
        fn check(field: &'static str, value: f64, lo: f64, hi: f64, range: &'static str) -> Result<(), SettingsError> {
            if value < lo || value > hi {
                return Err(SettingsError::OutOfRange { field, range, value });
            }
            Ok(())
        }

        check(
            "starting_capital",
            self.starting_capital,
            10_000.0,
            f64::MAX,
            "[10_000, inf)",
        )?;
        check(
            "max_daily_loss_pct",
            self.max_daily_loss_pct,
            f64::MIN_POSITIVE,
            20.0,
            "(0, 20]",
        )?;
        check(
            "per_trade_risk_pct",
            self.per_trade_risk_pct,
            f64::MIN_POSITIVE,
            10.0,
            "(0, 10]",
        )?;
        if !(1..=200).contains(&self.max_positions) {
            return Err(SettingsError::OutOfRange {
                field: "max_positions",
                range: "[1, 200]",
                value: f64::from(self.max_positions),
            });
        }
        if !(1..=999).contains(&self.max_trades_per_day) {
            return Err(SettingsError::OutOfRange {
                field: "max_trades_per_day",
                range: "[1, 999]",
                value: f64::from(self.max_trades_per_day),
            });
        }
        check("min_ml_score", self.min_ml_score, 0.0, 1.0, "[0, 1]")?;
        check(
            "min_strategy_strength",
            self.min_strategy_strength,
            0.0,
            100.0,
            "[0, 100]",
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_loss_pct() {
        let mut s = Settings::default();
        s.max_daily_loss_pct = 25.0;
        assert!(s.validate().is_err());
    }

    #[test]
    fn rejects_too_few_max_positions() {
        let mut s = Settings::default();
        s.max_positions = 0;
        assert!(s.validate().is_err());
    }
}
