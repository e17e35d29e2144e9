use super::EPSILON;

/// Calculate Simple Moving Average (SMA) of the last `period` prices
pub fn calculate_sma(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period {
        return None;
    }

    let sum: f64 = prices.iter().rev().take(period).sum();
    Some(sum / period as f64)
}

/// Exponentially weighted average of the last `span` prices
///
/// Weight for the j-th price of the span (j = 0 is the oldest) is
/// `exp((span - 1 - j) / (span - 1))`, normalized to sum to one.
pub fn calculate_weighted_average(prices: &[f64], span: usize) -> Option<f64> {
    if span < 2 || prices.len() < span {
        return None;
    }

    let tail = &prices[prices.len() - span..];
    let denom = (span - 1) as f64;

    let (weighted, total) = tail
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(acc, total), (j, price)| {
            let w = ((span - 1 - j) as f64 / denom).exp();
            (acc + w * price, total + w)
        });

    Some(weighted / total)
}

/// Divergence of the 20-period SMA from the 50-period SMA
///
/// `|SMA20 - SMA50| / SMA50`, 0 when the long average is zero.
pub fn calculate_trend_strength(prices: &[f64]) -> Option<f64> {
    let short = calculate_sma(prices, 20)?;
    let long = calculate_sma(prices, 50)?;

    if long.abs() < EPSILON {
        return Some(0.0);
    }

    Some((short - long).abs() / long)
}
