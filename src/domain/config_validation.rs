//! Configuration validation.
//!
//! Validates every config field before a session is built.

use crate::domain::error::SimtraderError;
use crate::domain::session_config::StrategyKind;
use crate::ports::config_port::ConfigPort;

pub fn validate_session_config(config: &dyn ConfigPort) -> Result<(), SimtraderError> {
    validate_initial_balance(config)?;
    validate_target(config)?;
    validate_strategy(config)?;
    validate_fee_rate(config)?;
    validate_intervals(config)?;
    validate_universe_size(config)?;
    Ok(())
}

pub fn validate_autotrade_config(config: &dyn ConfigPort) -> Result<(), SimtraderError> {
    validate_thresholds(config)?;
    validate_probability(config)?;
    validate_invest_fractions(config)?;
    validate_limits(config)?;
    Ok(())
}

pub fn validate_feed_config(config: &dyn ConfigPort) -> Result<(), SimtraderError> {
    let source = config
        .get_string("feed", "source")
        .unwrap_or_else(|| "static".to_string());
    match source.trim().to_lowercase().as_str() {
        "static" | "random_walk" => {}
        "csv" => match config.get_string("feed", "path") {
            Some(p) if !p.trim().is_empty() => {}
            _ => {
                return Err(SimtraderError::ConfigMissing {
                    section: "feed".to_string(),
                    key: "path".to_string(),
                });
            }
        },
        other => {
            return Err(invalid(
                "feed",
                "source",
                format!("unknown feed source '{other}', expected static, random_walk or csv"),
            ));
        }
    }

    let volatility = config.get_double("feed", "volatility", 0.002);
    if !(0.0..1.0).contains(&volatility) {
        return Err(invalid("feed", "volatility", "volatility must be in [0, 1)".into()));
    }
    Ok(())
}

fn invalid(section: &str, key: &str, reason: String) -> SimtraderError {
    SimtraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason,
    }
}

fn validate_initial_balance(config: &dyn ConfigPort) -> Result<(), SimtraderError> {
    if config.get_string("session", "initial_balance").is_none() {
        return Err(SimtraderError::ConfigMissing {
            section: "session".to_string(),
            key: "initial_balance".to_string(),
        });
    }
    let value = config.get_double("session", "initial_balance", 0.0);
    if value <= 0.0 || !value.is_finite() {
        return Err(invalid(
            "session",
            "initial_balance",
            "initial_balance must be positive".into(),
        ));
    }
    Ok(())
}

fn validate_target(config: &dyn ConfigPort) -> Result<(), SimtraderError> {
    let profit = config.get_double("session", "target_profit", 20.0);
    if profit <= 0.0 {
        return Err(invalid(
            "session",
            "target_profit",
            "target_profit must be positive".into(),
        ));
    }
    let period = config.get_int("session", "target_period", 30);
    if period <= 0 || period > i64::from(u32::MAX) {
        return Err(invalid(
            "session",
            "target_period",
            "target_period must be a positive number of days".into(),
        ));
    }
    Ok(())
}

fn validate_strategy(config: &dyn ConfigPort) -> Result<(), SimtraderError> {
    if let Some(s) = config.get_string("session", "strategy") {
        s.parse::<StrategyKind>()
            .map_err(|reason| invalid("session", "strategy", reason))?;
    }
    Ok(())
}

fn validate_fee_rate(config: &dyn ConfigPort) -> Result<(), SimtraderError> {
    let value = config.get_double("engine", "fee_rate", 0.001);
    if !(0.0..1.0).contains(&value) {
        return Err(invalid("engine", "fee_rate", "fee_rate must be in [0, 1)".into()));
    }
    Ok(())
}

fn validate_intervals(config: &dyn ConfigPort) -> Result<(), SimtraderError> {
    for key in ["tick_interval_ms", "price_refresh_ms"] {
        if config.get_int("engine", key, 1) <= 0 {
            return Err(invalid("engine", key, format!("{key} must be positive")));
        }
    }
    Ok(())
}

fn validate_universe_size(config: &dyn ConfigPort) -> Result<(), SimtraderError> {
    if config.get_int("engine", "universe_size", 20) <= 0 {
        return Err(invalid(
            "engine",
            "universe_size",
            "universe_size must be positive".into(),
        ));
    }
    Ok(())
}

fn validate_thresholds(config: &dyn ConfigPort) -> Result<(), SimtraderError> {
    if config.get_double("autotrade", "take_profit_pct", 0.5) <= 0.0 {
        return Err(invalid(
            "autotrade",
            "take_profit_pct",
            "take_profit_pct must be positive".into(),
        ));
    }
    if config.get_double("autotrade", "stop_loss_pct", -2.0) >= 0.0 {
        return Err(invalid(
            "autotrade",
            "stop_loss_pct",
            "stop_loss_pct must be negative".into(),
        ));
    }
    let fraction = config.get_double("autotrade", "take_profit_fraction", 0.5);
    if fraction <= 0.0 || fraction > 1.0 {
        return Err(invalid(
            "autotrade",
            "take_profit_fraction",
            "take_profit_fraction must be between 0 and 1".into(),
        ));
    }
    Ok(())
}

fn validate_probability(config: &dyn ConfigPort) -> Result<(), SimtraderError> {
    let value = config.get_double("autotrade", "entry_probability", 0.8);
    if !(0.0..=1.0).contains(&value) {
        return Err(invalid(
            "autotrade",
            "entry_probability",
            "entry_probability must be between 0 and 1".into(),
        ));
    }
    Ok(())
}

fn validate_invest_fractions(config: &dyn ConfigPort) -> Result<(), SimtraderError> {
    let min = config.get_double("autotrade", "min_invest_fraction", 0.005);
    let max = config.get_double("autotrade", "max_invest_fraction", 0.02);
    if min <= 0.0 || max > 1.0 || min > max {
        return Err(invalid(
            "autotrade",
            "min_invest_fraction",
            "invest fractions must satisfy 0 < min <= max <= 1".into(),
        ));
    }
    Ok(())
}

fn validate_limits(config: &dyn ConfigPort) -> Result<(), SimtraderError> {
    if config.get_double("autotrade", "min_balance", 1000.0) < 0.0 {
        return Err(invalid(
            "autotrade",
            "min_balance",
            "min_balance must be non-negative".into(),
        ));
    }
    if config.get_int("autotrade", "max_open_positions", 50) <= 0 {
        return Err(invalid(
            "autotrade",
            "max_open_positions",
            "max_open_positions must be positive".into(),
        ));
    }
    if config.get_double("autotrade", "min_quantity", 0.00001) < 0.0 {
        return Err(invalid(
            "autotrade",
            "min_quantity",
            "min_quantity must be non-negative".into(),
        ));
    }
    Ok(())
}
