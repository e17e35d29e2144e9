/// Average range over the last `period` prices
///
/// Mean of absolute successive close-to-close deltas. This is a proxy for
/// ATR built from closes only, not a high/low/close true range.
pub fn calculate_average_range(prices: &[f64], period: usize) -> Option<f64> {
    if period < 2 || prices.len() < period {
        return None;
    }

    let window = &prices[prices.len() - period..];
    let total: f64 = window.windows(2).map(|w| (w[1] - w[0]).abs()).sum();

    Some(total / (period - 1) as f64)
}
