// Core modules
pub mod api;
pub mod config;
pub mod error;
pub mod execution;
pub mod grid;
pub mod indicators;
pub mod models;
pub mod risk;
pub mod strategy;

// Re-export commonly used types
pub use api::ExchangeGateway;
pub use config::BotConfig;
pub use error::{ConfigError, GatewayError};
pub use execution::{CycleOutcome, TradingEngine};
pub use models::*;
pub use strategy::SignalProvider;
