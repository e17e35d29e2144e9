use super::EPSILON;

/// Rate of change between the latest price and the price `period` samples back
///
/// `(last - price[-period]) / (price[-period] + ε)`
pub fn calculate_momentum(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period {
        return None;
    }

    let last = prices[prices.len() - 1];
    let reference = prices[prices.len() - period];

    Some((last - reference) / (reference + EPSILON))
}
