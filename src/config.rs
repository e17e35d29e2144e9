use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::api::delta::DELTA_API_BASE;
use crate::error::ConfigError;
use crate::grid::LadderMode;
use crate::risk::RiskParameters;
use crate::strategy::{SignalEnsemble, TrendModel};

/// Startup configuration
///
/// Loaded from a JSON/TOML/YAML file and overlaid by `GRIDBOT_*`
/// environment variables. Only the trading keys are required.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BotConfig {
    pub symbol: String,
    pub grid_levels: usize,
    /// Fraction between ladder levels, 0.01 = 1%
    pub grid_width: f64,
    /// Percent of balance risked per trade, in (0, 100]
    pub risk_percentage: f64,
    /// Exchange lot size
    pub min_quantity: f64,
    #[serde(alias = "cycle_delay")]
    pub cycle_delay_seconds: f64,
    pub min_balance: f64,

    #[serde(default = "default_initial_capital")]
    pub initial_capital: f64,
    #[serde(default = "default_activation_threshold")]
    pub activation_threshold: f64,

    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    #[serde(default = "default_warmup_prices")]
    pub warmup_prices: usize,
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub ladder_mode: LadderMode,
    #[serde(default)]
    pub trend_model: TrendModel,

    #[serde(default = "default_max_daily_loss_fraction")]
    pub max_daily_loss_fraction: f64,
    #[serde(default = "default_max_trades_per_day")]
    pub max_trades_per_day: u32,
    #[serde(default = "default_max_position_fraction")]
    pub max_position_fraction: f64,
    #[serde(default = "default_mean_reversion_confidence")]
    pub mean_reversion_confidence: f64,

    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
}

fn default_initial_capital() -> f64 {
    1000.0
}

fn default_activation_threshold() -> f64 {
    0.5
}

fn default_history_capacity() -> usize {
    500
}

fn default_warmup_prices() -> usize {
    50
}

fn default_settle_delay_ms() -> u64 {
    1000
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_max_daily_loss_fraction() -> f64 {
    0.05
}

fn default_max_trades_per_day() -> u32 {
    5
}

fn default_max_position_fraction() -> f64 {
    0.05
}

fn default_mean_reversion_confidence() -> f64 {
    0.7
}

fn default_base_url() -> String {
    DELTA_API_BASE.to_string()
}

fn default_requests_per_second() -> u32 {
    5
}

impl BotConfig {
    /// Trading defaults for `symbol`; mainly for tests and paper runs
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            grid_levels: 3,
            grid_width: 0.01,
            risk_percentage: 1.0,
            min_quantity: 1.0,
            cycle_delay_seconds: 60.0,
            min_balance: 1000.0,
            initial_capital: default_initial_capital(),
            activation_threshold: default_activation_threshold(),
            history_capacity: default_history_capacity(),
            warmup_prices: default_warmup_prices(),
            settle_delay_ms: default_settle_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            ladder_mode: LadderMode::default(),
            trend_model: TrendModel::default(),
            max_daily_loss_fraction: default_max_daily_loss_fraction(),
            max_trades_per_day: default_max_trades_per_day(),
            max_position_fraction: default_max_position_fraction(),
            mean_reversion_confidence: default_mean_reversion_confidence(),
            base_url: default_base_url(),
            requests_per_second: default_requests_per_second(),
        }
    }

    /// Load from `path` (format by extension) overlaid by `GRIDBOT_*` env vars
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "Loading configuration");

        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path).required(false))
            .add_source(::config::Environment::with_prefix("GRIDBOT").try_parsing(true))
            .build()?;

        let cfg: BotConfig = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a JSON document, used for inline configs
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from_str(json, ::config::FileFormat::Json))
            .build()?;

        let cfg: BotConfig = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbol.trim().is_empty() {
            return Err(ConfigError::invalid("symbol", "must not be empty"));
        }
        if self.grid_levels < 1 {
            return Err(ConfigError::invalid("grid_levels", "must be at least 1"));
        }
        if !(self.grid_width > 0.0 && self.grid_width * (self.grid_levels as f64) < 1.0) {
            return Err(ConfigError::invalid(
                "grid_width",
                format!(
                    "{} must be positive and keep every buy level above zero",
                    self.grid_width
                ),
            ));
        }
        if !(self.risk_percentage > 0.0 && self.risk_percentage <= 100.0) {
            return Err(ConfigError::invalid(
                "risk_percentage",
                format!("{} not in (0, 100]", self.risk_percentage),
            ));
        }
        if !(self.min_quantity > 0.0) {
            return Err(ConfigError::invalid("min_quantity", "must be positive"));
        }
        if !(self.cycle_delay_seconds > 0.0) {
            return Err(ConfigError::invalid("cycle_delay_seconds", "must be positive"));
        }
        if !(self.min_balance >= 0.0) {
            return Err(ConfigError::invalid("min_balance", "must not be negative"));
        }
        if !(self.initial_capital > 0.0) {
            return Err(ConfigError::invalid("initial_capital", "must be positive"));
        }
        if !(0.0..=1.0).contains(&self.activation_threshold) {
            return Err(ConfigError::invalid(
                "activation_threshold",
                "must be within [0, 1]",
            ));
        }
        let lookback = SignalEnsemble::default().max_lookback();
        if self.history_capacity < lookback {
            return Err(ConfigError::invalid(
                "history_capacity",
                format!(
                    "{} is below the {} prices the longest signal provider needs",
                    self.history_capacity, lookback
                ),
            ));
        }
        for (field, value) in [
            ("max_daily_loss_fraction", self.max_daily_loss_fraction),
            ("max_position_fraction", self.max_position_fraction),
            ("mean_reversion_confidence", self.mean_reversion_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::invalid(field, "must be within [0, 1]"));
            }
        }
        Ok(())
    }

    pub fn cycle_delay(&self) -> Duration {
        Duration::from_secs_f64(self.cycle_delay_seconds)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn risk_parameters(&self) -> RiskParameters {
        RiskParameters {
            capital: self.initial_capital,
            risk_per_trade_fraction: self.risk_percentage / 100.0,
            max_daily_loss_fraction: self.max_daily_loss_fraction,
            max_trades_per_day: self.max_trades_per_day,
            max_position_fraction: self.max_position_fraction,
            ..RiskParameters::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "symbol": "BTCUSD",
        "grid_levels": 3,
        "grid_width": 0.01,
        "risk_percentage": 1,
        "min_quantity": 1,
        "cycle_delay": 60,
        "min_balance": 1000
    }"#;

    #[test]
    fn test_minimal_config_gets_defaults() {
        let cfg = BotConfig::from_json(MINIMAL).unwrap();
        assert_eq!(cfg.symbol, "BTCUSD");
        assert_eq!(cfg.cycle_delay_seconds, 60.0);
        assert_eq!(cfg.initial_capital, 1000.0);
        assert_eq!(cfg.activation_threshold, 0.5);
        assert_eq!(cfg.history_capacity, 500);
        assert_eq!(cfg.warmup_prices, 50);
        assert_eq!(cfg.ladder_mode, LadderMode::Symmetric);
        assert_eq!(cfg.trend_model, TrendModel::Filtered);
        assert_eq!(cfg.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_overrides() {
        let json = MINIMAL.replace(
            "\"min_balance\": 1000",
            "\"min_balance\": 50, \"ladder_mode\": \"directional\", \"trend_model\": \"baseline\"",
        );
        let cfg = BotConfig::from_json(&json).unwrap();
        assert_eq!(cfg.min_balance, 50.0);
        assert_eq!(cfg.ladder_mode, LadderMode::Directional);
        assert_eq!(cfg.trend_model, TrendModel::Baseline);
    }

    #[test]
    fn test_missing_required_key() {
        let json = MINIMAL.replace("\"symbol\": \"BTCUSD\",", "");
        assert!(matches!(
            BotConfig::from_json(&json),
            Err(ConfigError::Load(_))
        ));
    }

    #[test]
    fn test_validation_ranges() {
        let mut cfg = BotConfig::new("BTCUSD");
        assert!(cfg.validate().is_ok());

        cfg.grid_levels = 0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Invalid { field: "grid_levels", .. })
        ));

        let mut cfg = BotConfig::new("BTCUSD");
        cfg.risk_percentage = 150.0;
        assert!(cfg.validate().is_err());

        let mut cfg = BotConfig::new("BTCUSD");
        cfg.min_quantity = 0.0;
        assert!(cfg.validate().is_err());

        let mut cfg = BotConfig::new("BTCUSD");
        cfg.cycle_delay_seconds = 0.0;
        assert!(cfg.validate().is_err());

        let mut cfg = BotConfig::new("BTCUSD");
        cfg.grid_width = 0.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_history_capacity_covers_lookback() {
        let mut cfg = BotConfig::new("BTCUSD");
        cfg.history_capacity = 499;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Invalid { field: "history_capacity", .. })
        ));

        cfg.history_capacity = 0;
        assert!(cfg.validate().is_err());

        cfg.history_capacity = 500;
        assert!(cfg.validate().is_ok());

        cfg.history_capacity = 1000;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_risk_parameters_from_percentage() {
        let mut cfg = BotConfig::new("BTCUSD");
        cfg.risk_percentage = 2.0;
        cfg.initial_capital = 5000.0;

        let params = cfg.risk_parameters();
        assert_eq!(params.risk_per_trade_fraction, 0.02);
        assert_eq!(params.capital, 5000.0);
        assert_eq!(params.safety_factor, 0.7);
    }
}
