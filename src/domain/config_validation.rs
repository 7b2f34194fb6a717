//! Configuration validation.
//!
//! Validates every config field before a repository or simulator is built.

use crate::domain::bar::BarFormat;
use crate::domain::error::TraderError;
use crate::ports::config_port::ConfigPort;

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), TraderError> {
    validate_repository_config(config)?;
    validate_trade_config(config)?;
    validate_commission_config(config)?;
    Ok(())
}

pub fn validate_repository_config(config: &dyn ConfigPort) -> Result<(), TraderError> {
    if let Some(extension) = config.get_string("repository", "extension") {
        if BarFormat::from_extension(&extension).is_err() {
            return Err(invalid(
                "repository",
                "extension",
                format!("unsupported extension {extension:?}"),
            ));
        }
    }
    if let Some(base_dir) = config.get_string("repository", "base_dir") {
        if base_dir.trim().is_empty() {
            return Err(invalid("repository", "base_dir", "base_dir must not be empty"));
        }
    }
    Ok(())
}

pub fn validate_trade_config(config: &dyn ConfigPort) -> Result<(), TraderError> {
    require_positive(config, "trade", "starting_balance")?;
    require_positive(config, "trade", "min_tradable_size")?;
    Ok(())
}

pub fn validate_commission_config(config: &dyn ConfigPort) -> Result<(), TraderError> {
    for key in [
        "commission_rate",
        "min_commission",
        "slippage_rate",
        "stamp_duty_rate",
    ] {
        require_non_negative(config, "commission", key)?;
    }
    for key in ["commission_rate", "slippage_rate", "stamp_duty_rate"] {
        let value = config.get_double("commission", key, 0.0);
        if value >= 1.0 {
            return Err(invalid(
                "commission",
                key,
                format!("{key} is a fraction of trade value and must be below 1"),
            ));
        }
    }
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> TraderError {
    TraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// Present values must parse as numbers; absent ones take their defaults.
fn numeric(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<f64>, TraderError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| invalid(section, key, format!("{key} must be a number, got {raw:?}"))),
    }
}

fn require_positive(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), TraderError> {
    match numeric(config, section, key)? {
        Some(value) if !(value > 0.0) => {
            Err(invalid(section, key, format!("{key} must be positive")))
        }
        _ => Ok(()),
    }
}

fn require_non_negative(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<(), TraderError> {
    match numeric(config, section, key)? {
        Some(value) if !(value >= 0.0) => {
            Err(invalid(section, key, format!("{key} must be non-negative")))
        }
        _ => Ok(()),
    }
}
