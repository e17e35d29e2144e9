use crate::indicators::mean;
use crate::models::{Direction, ProviderId, Signal};
use crate::strategy::{MarketContext, SignalProvider};

/// How a horizon turns its window into a vote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendTest {
    /// Mean of the last `n` prices against the mean of the `n` before them
    RecentVsPrevious(usize),
    /// Mean of the whole window against the mean of its first half
    WholeVsFirstHalf,
}

/// A slice of the price history, addressed from the newest price backwards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Horizon {
    /// Prices between the end of this window and the newest price
    pub offset: usize,
    pub len: usize,
    pub test: TrendTest,
}

impl Horizon {
    /// Total history length needed to fill the window
    pub fn required(&self) -> usize {
        self.offset + self.len
    }

    fn window<'a>(&self, prices: &'a [f64]) -> Option<&'a [f64]> {
        if prices.len() < self.required() {
            return None;
        }
        let end = prices.len() - self.offset;
        Some(&prices[end - self.len..end])
    }

    /// +1 when the recent mean is above the earlier one, -1 otherwise
    fn vote(&self, prices: &[f64]) -> Option<i8> {
        let window = self.window(prices)?;

        let (recent, earlier) = match self.test {
            TrendTest::RecentVsPrevious(n) => {
                if n == 0 || window.len() < 2 * n {
                    return None;
                }
                let recent = &window[window.len() - n..];
                let earlier = &window[window.len() - 2 * n..window.len() - n];
                (mean(recent)?, mean(earlier)?)
            }
            TrendTest::WholeVsFirstHalf => (mean(window)?, mean(&window[..window.len() / 2])?),
        };

        Some(if recent > earlier { 1 } else { -1 })
    }
}

#[derive(Debug, Clone)]
pub struct ConfluenceConfig {
    pub short: Horizon,
    pub mid: Horizon,
    pub long: Horizon,
    /// Agreeing votes needed before a direction is emitted
    pub min_agreement: usize,
}

impl Default for ConfluenceConfig {
    fn default() -> Self {
        Self {
            short: Horizon {
                offset: 0,
                len: 100,
                test: TrendTest::RecentVsPrevious(5),
            },
            mid: Horizon {
                offset: 200,
                len: 100,
                test: TrendTest::WholeVsFirstHalf,
            },
            long: Horizon {
                offset: 400,
                len: 100,
                test: TrendTest::WholeVsFirstHalf,
            },
            min_agreement: 2,
        }
    }
}

/// Multi-horizon trend agreement
///
/// Each of three horizons votes up or down; a direction is emitted when at
/// least two agree, with confidence equal to the agreeing fraction.
#[derive(Debug, Clone, Default)]
pub struct ConfluenceTrader {
    config: ConfluenceConfig,
}

impl ConfluenceTrader {
    pub fn new(config: ConfluenceConfig) -> Self {
        Self { config }
    }

    fn horizons(&self) -> [Horizon; 3] {
        [self.config.short, self.config.mid, self.config.long]
    }
}

impl SignalProvider for ConfluenceTrader {
    fn generate_signal(&self, prices: &[f64], _context: &MarketContext) -> Signal {
        let mut votes = Vec::with_capacity(3);
        for horizon in self.horizons() {
            match horizon.vote(prices) {
                Some(v) => votes.push(v),
                None => return Signal::none(self.provider_id()),
            }
        }

        let ups = votes.iter().filter(|&&v| v > 0).count();
        let downs = votes.iter().filter(|&&v| v < 0).count();
        let agreeing = ups.max(downs);

        if agreeing < self.config.min_agreement {
            tracing::debug!(?votes, "No confluence");
            return Signal::none(self.provider_id());
        }

        let direction = if ups > downs {
            Direction::Up
        } else {
            Direction::Down
        };
        let confidence = agreeing as f64 / votes.len() as f64;

        tracing::debug!(?votes, %direction, confidence, "Confluence");

        Signal::new(self.provider_id(), direction, confidence)
    }

    fn name(&self) -> &str {
        "Confluence Trader"
    }

    fn provider_id(&self) -> ProviderId {
        ProviderId::Confluence
    }

    fn min_prices_required(&self) -> usize {
        self.horizons()
            .iter()
            .map(Horizon::required)
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> MarketContext {
        MarketContext::default()
    }

    #[test]
    fn test_requires_full_history() {
        let trader = ConfluenceTrader::default();
        assert_eq!(trader.min_prices_required(), 500);

        let prices: Vec<f64> = (0..499).map(|i| 100.0 + i as f64).collect();
        let signal = trader.generate_signal(&prices, &ctx());
        assert!(signal.is_none());
        assert_eq!(signal.confidence, 0.0);
    }

    #[test]
    fn test_unanimous_uptrend() {
        let trader = ConfluenceTrader::default();
        let prices: Vec<f64> = (0..500).map(|i| 100.0 + 0.1 * i as f64).collect();

        let signal = trader.generate_signal(&prices, &ctx());
        assert_eq!(signal.direction, Direction::Up);
        assert_eq!(signal.confidence, 1.0);
    }

    #[test]
    fn test_unanimous_downtrend() {
        let trader = ConfluenceTrader::default();
        let prices: Vec<f64> = (0..500).map(|i| 200.0 - 0.1 * i as f64).collect();

        let signal = trader.generate_signal(&prices, &ctx());
        assert_eq!(signal.direction, Direction::Down);
        assert_eq!(signal.confidence, 1.0);
    }

    #[test]
    fn test_two_of_three_agreement() {
        let trader = ConfluenceTrader::default();
        // Long and mid horizons rise, the short horizon turns down at the end
        let mut prices: Vec<f64> = (0..495).map(|i| 100.0 + 0.1 * i as f64).collect();
        prices.extend([130.0, 129.0, 128.0, 127.0, 126.0]);

        let signal = trader.generate_signal(&prices, &ctx());
        assert_eq!(signal.direction, Direction::Up);
        assert!((signal.confidence - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_flat_market_votes_down() {
        let trader = ConfluenceTrader::default();
        // Equal means count as not rising on every horizon
        let prices = vec![100.0; 500];

        let signal = trader.generate_signal(&prices, &ctx());
        assert_eq!(signal.direction, Direction::Down);
        assert_eq!(signal.confidence, 1.0);
    }

    #[test]
    fn test_flat_tail_loses_to_rising_short_horizon() {
        let trader = ConfluenceTrader::default();
        // Flat mid and long horizons vote down, the rising short one is outvoted
        let mut prices = vec![100.0; 495];
        prices.extend([101.0, 102.0, 103.0, 104.0, 105.0]);

        let signal = trader.generate_signal(&prices, &ctx());
        assert_eq!(signal.direction, Direction::Down);
        assert!((signal.confidence - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_horizon_window_addressing() {
        let horizon = Horizon {
            offset: 2,
            len: 3,
            test: TrendTest::WholeVsFirstHalf,
        };
        let prices = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        assert_eq!(horizon.window(&prices), Some(&[2.0, 3.0, 4.0][..]));
        assert_eq!(horizon.vote(&prices), Some(1));
    }
}
