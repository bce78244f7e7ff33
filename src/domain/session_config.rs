//! Session parameters, read once at session start.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::domain::error::SimtraderError;
use crate::domain::execution::{DEFAULT_FEE_RATE, ExecutionConfig};
use crate::domain::strategy::RiskRules;
use crate::ports::config_port::ConfigPort;

/// Risk profile chosen at setup. Recorded with the session; every profile
/// currently runs the same risk rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Conservative,
    Balanced,
    Combined,
    Aggressive,
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "conservative" => Ok(StrategyKind::Conservative),
            "balanced" => Ok(StrategyKind::Balanced),
            "combined" => Ok(StrategyKind::Combined),
            "aggressive" => Ok(StrategyKind::Aggressive),
            other => Err(format!(
                "unknown strategy '{other}', expected conservative, balanced, combined or aggressive"
            )),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StrategyKind::Conservative => "conservative",
            StrategyKind::Balanced => "balanced",
            StrategyKind::Combined => "combined",
            StrategyKind::Aggressive => "aggressive",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub initial_balance: f64,
    pub target_profit_pct: f64,
    pub target_period_days: u32,
    pub strategy: StrategyKind,
    pub auto_trade: bool,
    pub execution: ExecutionConfig,
    pub tick_interval: Duration,
    pub price_refresh: Duration,
    pub universe_size: usize,
    pub seed: Option<u64>,
    pub rules: RiskRules,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            initial_balance: 1_000_000.0,
            target_profit_pct: 20.0,
            target_period_days: 30,
            strategy: StrategyKind::Combined,
            auto_trade: false,
            execution: ExecutionConfig::default(),
            tick_interval: Duration::from_millis(500),
            price_refresh: Duration::from_millis(10_000),
            universe_size: 20,
            seed: None,
            rules: RiskRules::default(),
        }
    }
}

impl SessionConfig {
    /// Build from `[session]`, `[engine]` and `[autotrade]`. Run
    /// `validate_session_config` first; this only fills defaults.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, SimtraderError> {
        let defaults = SessionConfig::default();
        let rule_defaults = RiskRules::default();

        let initial_balance = config
            .get_string("session", "initial_balance")
            .ok_or_else(|| SimtraderError::ConfigMissing {
                section: "session".to_string(),
                key: "initial_balance".to_string(),
            })
            .map(|_| config.get_double("session", "initial_balance", 0.0))?;

        let strategy = match config.get_string("session", "strategy") {
            Some(s) => s.parse().map_err(|reason| SimtraderError::ConfigInvalid {
                section: "session".to_string(),
                key: "strategy".to_string(),
                reason,
            })?,
            None => defaults.strategy,
        };

        let seed = config
            .get_string("engine", "seed")
            .and_then(|s| s.trim().parse::<u64>().ok());

        let rules = RiskRules {
            take_profit_pct: config.get_double(
                "autotrade",
                "take_profit_pct",
                rule_defaults.take_profit_pct,
            ),
            take_profit_fraction: config.get_double(
                "autotrade",
                "take_profit_fraction",
                rule_defaults.take_profit_fraction,
            ),
            stop_loss_pct: config.get_double(
                "autotrade",
                "stop_loss_pct",
                rule_defaults.stop_loss_pct,
            ),
            entry_probability: config.get_double(
                "autotrade",
                "entry_probability",
                rule_defaults.entry_probability,
            ),
            min_balance: config.get_double("autotrade", "min_balance", rule_defaults.min_balance),
            max_open_positions: config.get_int(
                "autotrade",
                "max_open_positions",
                rule_defaults.max_open_positions as i64,
            ) as usize,
            min_invest_fraction: config.get_double(
                "autotrade",
                "min_invest_fraction",
                rule_defaults.min_invest_fraction,
            ),
            max_invest_fraction: config.get_double(
                "autotrade",
                "max_invest_fraction",
                rule_defaults.max_invest_fraction,
            ),
            min_quantity: config.get_double(
                "autotrade",
                "min_quantity",
                rule_defaults.min_quantity,
            ),
        };

        Ok(SessionConfig {
            initial_balance,
            target_profit_pct: config.get_double(
                "session",
                "target_profit",
                defaults.target_profit_pct,
            ),
            target_period_days: config.get_int(
                "session",
                "target_period",
                i64::from(defaults.target_period_days),
            ) as u32,
            strategy,
            auto_trade: config.get_bool("session", "auto_trade", defaults.auto_trade),
            execution: ExecutionConfig {
                fee_rate: config.get_double("engine", "fee_rate", DEFAULT_FEE_RATE),
            },
            tick_interval: Duration::from_millis(config.get_int(
                "engine",
                "tick_interval_ms",
                defaults.tick_interval.as_millis() as i64,
            ) as u64),
            price_refresh: Duration::from_millis(config.get_int(
                "engine",
                "price_refresh_ms",
                defaults.price_refresh.as_millis() as i64,
            ) as u64),
            universe_size: config.get_int(
                "engine",
                "universe_size",
                defaults.universe_size as i64,
            ) as usize,
            seed,
            rules,
        })
    }
}
