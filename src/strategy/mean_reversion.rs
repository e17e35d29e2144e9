use crate::indicators::{calculate_bollinger_bands, calculate_volatility};
use crate::models::{Direction, ProviderId, Signal};
use crate::strategy::{MarketContext, SignalProvider};

/// Bollinger-band mean reversion trader
///
/// Fades moves outside the bands, but only inside a volatility window:
/// - Price above upper band: Short
/// - Price below lower band: Long
///
/// Volatility must lie strictly between `min_volatility` and `max_volatility`.
/// Below it the market is too quiet to trust a reversal, above it too
/// chaotic to trust a return to the mean.
#[derive(Debug, Clone)]
pub struct MeanReversionTrader {
    config: MeanReversionConfig,
}

#[derive(Debug, Clone)]
pub struct MeanReversionConfig {
    /// Bollinger and volatility window
    pub period: usize,

    /// Band width in standard deviations
    pub band_width: f64,

    pub min_volatility: f64,

    pub max_volatility: f64,

    /// Confidence attached to an emitted signal
    pub signal_confidence: f64,
}

impl Default for MeanReversionConfig {
    fn default() -> Self {
        Self {
            period: 20,
            band_width: 2.0,
            min_volatility: 0.015,
            max_volatility: 0.05,
            signal_confidence: 0.7,
        }
    }
}

impl MeanReversionTrader {
    pub fn new(config: MeanReversionConfig) -> Self {
        Self { config }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.config.signal_confidence = confidence;
        self
    }
}

impl Default for MeanReversionTrader {
    fn default() -> Self {
        Self::new(MeanReversionConfig::default())
    }
}

impl SignalProvider for MeanReversionTrader {
    fn generate_signal(&self, prices: &[f64], _context: &MarketContext) -> Signal {
        let none = Signal::none(self.provider_id());

        let Some(&current_price) = prices.last() else {
            return none;
        };
        let Some(bands) =
            calculate_bollinger_bands(prices, self.config.period, self.config.band_width)
        else {
            return none;
        };
        let Some(volatility) = calculate_volatility(prices, self.config.period) else {
            return none;
        };

        let tradeable =
            volatility > self.config.min_volatility && volatility < self.config.max_volatility;

        let direction = if !tradeable {
            None
        } else if current_price > bands.upper {
            Some(Direction::Short)
        } else if current_price < bands.lower {
            Some(Direction::Long)
        } else {
            None
        };

        match direction {
            Some(direction) => {
                tracing::debug!(
                    price = current_price,
                    upper = bands.upper,
                    lower = bands.lower,
                    volatility,
                    %direction,
                    "Mean reversion setup"
                );
                Signal::new(self.provider_id(), direction, self.config.signal_confidence)
            }
            None => none,
        }
    }

    fn name(&self) -> &str {
        "Mean Reversion"
    }

    fn provider_id(&self) -> ProviderId {
        ProviderId::MeanReversion
    }

    fn min_prices_required(&self) -> usize {
        self.config.period
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 19 prices alternating 100/102 (starting and ending at 100) plus a final print
    fn choppy_then(last: f64) -> Vec<f64> {
        let mut prices: Vec<f64> = (0..19)
            .map(|i| if i % 2 == 0 { 100.0 } else { 102.0 })
            .collect();
        prices.push(last);
        prices
    }

    #[test]
    fn test_spike_above_band_is_short() {
        let strategy = MeanReversionTrader::default();
        let signal = strategy.generate_signal(&choppy_then(110.0), &MarketContext::default());

        assert_eq!(signal.direction, Direction::Short);
        assert_eq!(signal.confidence, 0.7);
        assert_eq!(signal.provider, ProviderId::MeanReversion);
    }

    #[test]
    fn test_drop_below_band_is_long() {
        let strategy = MeanReversionTrader::default();
        let signal = strategy.generate_signal(&choppy_then(90.0), &MarketContext::default());

        assert_eq!(signal.direction, Direction::Long);
    }

    #[test]
    fn test_dead_market_ignored() {
        let strategy = MeanReversionTrader::default();
        let mut prices = vec![100.0; 19];
        prices.push(101.0);

        // Price is above the upper band but volatility is far below 1.5%
        let bands = calculate_bollinger_bands(&prices, 20, 2.0).unwrap();
        assert!(101.0 > bands.upper);

        let signal = strategy.generate_signal(&prices, &MarketContext::default());
        assert!(signal.is_none());
    }

    #[test]
    fn test_chaotic_market_ignored() {
        let strategy = MeanReversionTrader::default();
        let mut prices: Vec<f64> = (0..19)
            .map(|i| if i % 2 == 0 { 100.0 } else { 115.0 })
            .collect();
        prices.push(190.0);

        let vol = calculate_volatility(&prices, 20).unwrap();
        assert!(vol > 0.05);

        let signal = strategy.generate_signal(&prices, &MarketContext::default());
        assert!(signal.is_none());
    }

    #[test]
    fn test_inside_bands_no_signal() {
        let strategy = MeanReversionTrader::default();
        let signal = strategy.generate_signal(&choppy_then(101.0), &MarketContext::default());
        assert!(signal.is_none());
    }

    #[test]
    fn test_insufficient_data() {
        let strategy = MeanReversionTrader::default();
        let prices = vec![100.0; 19];
        let signal = strategy.generate_signal(&prices, &MarketContext::default());
        assert!(signal.is_none());
        assert_eq!(signal.confidence, 0.0);
    }
}
