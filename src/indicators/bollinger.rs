use super::moving_average::calculate_sma;
use super::volatility::sample_std_dev;

/// Bollinger Bands around a simple moving average
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Calculate Bollinger Bands
///
/// `middle = SMA(period)`, `upper/lower = middle ± k·σ` with σ the sample
/// standard deviation of the same `period` prices.
pub fn calculate_bollinger_bands(prices: &[f64], period: usize, k: f64) -> Option<BollingerBands> {
    if period < 2 || prices.len() < period {
        return None;
    }

    let window = &prices[prices.len() - period..];
    let middle = calculate_sma(window, period)?;
    let sigma = sample_std_dev(window)?;

    Some(BollingerBands {
        upper: middle + k * sigma,
        middle,
        lower: middle - k * sigma,
    })
}
