//! Layered configuration loading (SPEC_FULL §D): compiled-in [`Settings`]
//! defaults, an optional TOML file, then `KERNEL_*` environment overrides,
//! mirroring `services/gateway/src/config.rs`'s `config::Config::builder()`
//! pipeline.

use kernel_common::config::{Settings, SettingsError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("configuration out of range: {0}")]
    OutOfRange(#[from] SettingsError),
}

/// Loads settings from an optional file path layered over the compiled
/// defaults, with `KERNEL_*` environment variables taking final precedence
/// (e.g. `KERNEL_MAX_DAILY_LOSS_PCT=5` overrides `max_daily_loss_pct`).
/// Validates against the spec §6 closed ranges before returning.
pub fn load_settings(file_path: Option<&str>) -> Result<Settings, ConfigError> {
    let defaults = Settings::default();
    let mut builder = config::Config::builder().add_source(config::Config::try_from(&defaults)?);

    if let Some(path) = file_path {
        builder = builder.add_source(config::File::with_name(path).required(false));
    }

    let built = builder
        .add_source(config::Environment::with_prefix("KERNEL").separator("_"))
        .build()?;

    let settings: Settings = built.try_deserialize()?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_compiled_defaults_with_no_file() {
        let settings = load_settings(None).expect("defaults alone must validate");
        assert!((settings.starting_capital - 100_000.0).abs() < 1e-9);
    }

    #[test]
    fn missing_file_falls_back_to_defaults_without_erroring() {
        let settings = load_settings(Some("/nonexistent/path/does-not-exist")).expect("optional file must not be required");
        assert!((settings.max_daily_loss_pct - 3.0).abs() < 1e-9);
    }

    #[test]
    fn env_override_takes_precedence_over_defaults() {
        std::env::set_var("KERNEL_MAX_DAILY_LOSS_PCT", "5.5");
        let settings = load_settings(None).expect("override must still validate");
        std::env::remove_var("KERNEL_MAX_DAILY_LOSS_PCT");
        assert!((settings.max_daily_loss_pct - 5.5).abs() < 1e-9);
    }
}
