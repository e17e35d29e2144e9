use super::moving_average::calculate_weighted_average;
use super::EPSILON;

const SHORT_SPAN: usize = 12;
const LONG_SPAN: usize = 26;

/// MACD approximation normalized by the latest price
///
/// `(wavg_12 - wavg_26) / (last + ε)`, where the averages are exponentially
/// weighted over fixed spans instead of a full EMA history.
pub fn calculate_macd_ratio(prices: &[f64]) -> Option<f64> {
    let short = calculate_weighted_average(prices, SHORT_SPAN)?;
    let long = calculate_weighted_average(prices, LONG_SPAN)?;
    let last = *prices.last()?;

    Some((short - long) / (last + EPSILON))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_macd_insufficient_data() {
        let prices = vec![100.0; 25];
        assert!(calculate_macd_ratio(&prices).is_none());
    }

    #[test]
    fn test_macd_flat_market_is_zero() {
        let prices = vec![100.0; 40];
        let macd = calculate_macd_ratio(&prices).unwrap();
        assert!(macd.abs() < 1e-12);
    }

    #[test]
    fn test_macd_sign_follows_trend() {
        let rising: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        assert!(calculate_macd_ratio(&rising).unwrap() > 0.0);

        let falling: Vec<f64> = (0..40).map(|i| 200.0 - i as f64).collect();
        assert!(calculate_macd_ratio(&falling).unwrap() < 0.0);
    }
}
