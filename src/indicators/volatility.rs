/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation (divides by n)
pub fn population_std_dev(values: &[f64]) -> Option<f64> {
    let avg = mean(values)?;
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// Sample standard deviation (divides by n - 1)
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let avg = mean(values)?;
    let variance =
        values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

/// Relative volatility over the last `period` prices
///
/// Standard deviation of successive differences divided by the mean price.
/// Returns 0 when the mean price is 0.
pub fn calculate_volatility(prices: &[f64], period: usize) -> Option<f64> {
    if period < 2 || prices.len() < period {
        return None;
    }

    let window = &prices[prices.len() - period..];
    let diffs: Vec<f64> = window.windows(2).map(|w| w[1] - w[0]).collect();

    let avg_price = mean(window)?;
    if avg_price == 0.0 {
        return Some(0.0);
    }

    Some(population_std_dev(&diffs)? / avg_price)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_std_dev() {
        let values = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&values), Some(5.0));
        assert_eq!(population_std_dev(&values), Some(2.0));

        let sample = sample_std_dev(&values).unwrap();
        assert!((sample - (32.0_f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_std_dev_edge_cases() {
        assert!(mean(&[]).is_none());
        assert!(population_std_dev(&[]).is_none());
        assert!(sample_std_dev(&[1.0]).is_none());
    }

    #[test]
    fn test_volatility_constant_steps_is_zero() {
        let prices: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let vol = calculate_volatility(&prices, 20).unwrap();
        assert!(vol.abs() < 1e-12);
    }

    #[test]
    fn test_volatility_alternating() {
        // Diffs alternate +2/-2 so their std dev is exactly 2
        let prices: Vec<f64> = (0..21)
            .map(|i| if i % 2 == 0 { 100.0 } else { 102.0 })
            .collect();
        let vol = calculate_volatility(&prices, 21).unwrap();
        let expected = 2.0 / (2120.0 / 21.0);
        assert!((vol - expected).abs() < 1e-9);
    }

    #[test]
    fn test_volatility_zero_mean() {
        let prices = vec![0.0; 20];
        assert_eq!(calculate_volatility(&prices, 20), Some(0.0));
    }

    #[test]
    fn test_volatility_insufficient_data() {
        let prices = vec![100.0; 10];
        assert!(calculate_volatility(&prices, 20).is_none());
    }
}
