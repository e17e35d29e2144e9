// Technical indicators module
// Pure functions over a closing-price window; `None` means insufficient data

pub mod average_range;
pub mod bollinger;
pub mod macd;
pub mod momentum;
pub mod moving_average;
pub mod rsi;
pub mod volatility;

pub use average_range::calculate_average_range;
pub use bollinger::{calculate_bollinger_bands, BollingerBands};
pub use macd::calculate_macd_ratio;
pub use momentum::calculate_momentum;
pub use moving_average::{calculate_sma, calculate_trend_strength, calculate_weighted_average};
pub use rsi::calculate_rsi;
pub use volatility::{calculate_volatility, mean, population_std_dev, sample_std_dev};

/// Guards divisions by values that may be zero
pub const EPSILON: f64 = 1e-9;
