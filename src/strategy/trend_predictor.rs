use serde::{Deserialize, Serialize};

use crate::indicators::{
    calculate_macd_ratio, calculate_momentum, calculate_rsi, calculate_sma,
    calculate_trend_strength, calculate_volatility, EPSILON,
};
use crate::models::{Direction, ProviderId, Signal};
use crate::strategy::{MarketContext, SignalProvider};

/// Scoring model used by [`TrendPredictor`]
///
/// `Baseline` scores four features with sign-only votes. `Filtered` adds
/// RSI zones, a volatility filter, trend-strength confirmation and a dead
/// zone around zero that yields Hold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendModel {
    Baseline,
    #[default]
    Filtered,
}

/// Indicator snapshot the score is computed from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendFeatures {
    /// (price - SMA20) / SMA20
    pub price_vs_sma: f64,
    /// 0..=100
    pub rsi: f64,
    pub macd_ratio: f64,
    pub momentum: f64,
    pub volatility: f64,
    pub trend_strength: f64,
}

/// Feature-weighted directional predictor
///
/// Builds a feature vector from the most recent `lookback` prices and maps
/// a fixed-coefficient score to a direction and a confidence.
#[derive(Debug, Clone)]
pub struct TrendPredictor {
    model: TrendModel,
    lookback: usize,
}

impl TrendPredictor {
    pub const DEFAULT_LOOKBACK: usize = 100;

    pub fn new(model: TrendModel) -> Self {
        Self {
            model,
            lookback: Self::DEFAULT_LOOKBACK,
        }
    }

    /// Lookback is never allowed below the 50 prices the slowest feature needs
    pub fn with_lookback(mut self, lookback: usize) -> Self {
        self.lookback = lookback.max(50);
        self
    }

    pub fn model(&self) -> TrendModel {
        self.model
    }

    /// Compute features over the trailing lookback window
    pub fn features(&self, prices: &[f64]) -> Option<TrendFeatures> {
        if prices.len() < self.lookback {
            return None;
        }
        let window = &prices[prices.len() - self.lookback..];
        let last = *window.last()?;

        let sma_20 = calculate_sma(window, 20)?;

        Some(TrendFeatures {
            price_vs_sma: (last - sma_20) / (sma_20 + EPSILON),
            rsi: calculate_rsi(window, 14)?,
            macd_ratio: calculate_macd_ratio(window)?,
            momentum: calculate_momentum(window, 10)?,
            volatility: calculate_volatility(window, 20)?,
            trend_strength: calculate_trend_strength(window)?,
        })
    }

    /// Score features and map them to (direction, confidence)
    pub fn score(&self, f: &TrendFeatures) -> (Direction, f64) {
        match self.model {
            TrendModel::Baseline => {
                let mut score = 0.25 * sign(f.price_vs_sma > 0.0);
                score -= 0.15 * sign(f.rsi > 50.0);
                score += 0.2 * sign(f.macd_ratio > 0.0);
                score += 0.2 * sign(f.momentum > 0.0);

                let confidence = (score + 0.5) / 1.0;
                let direction = if score > 0.0 {
                    Direction::Up
                } else {
                    Direction::Down
                };
                (direction, confidence)
            }
            TrendModel::Filtered => {
                let mut score = 0.0;

                if f.price_vs_sma > 0.01 {
                    score += 0.3;
                } else if f.price_vs_sma < -0.01 {
                    score -= 0.3;
                }

                // Oversold favours a bounce, overbought a pullback
                if f.rsi < 30.0 {
                    score += 0.35;
                } else if f.rsi > 70.0 {
                    score -= 0.35;
                }

                if f.macd_ratio > 0.0 {
                    score += 0.25;
                }
                if f.momentum > 0.0 {
                    score += 0.2;
                }

                if f.volatility < 0.025 {
                    score += 0.15;
                } else if f.volatility > 0.08 {
                    score -= 0.2;
                }

                if f.trend_strength > 0.015 {
                    score += 0.1;
                }

                let confidence = (score + 0.5) / 1.15;
                let direction = if score > 0.1 {
                    Direction::Up
                } else if score < -0.1 {
                    Direction::Down
                } else {
                    Direction::Hold
                };
                (direction, confidence)
            }
        }
    }
}

impl Default for TrendPredictor {
    fn default() -> Self {
        Self::new(TrendModel::default())
    }
}

impl SignalProvider for TrendPredictor {
    fn generate_signal(&self, prices: &[f64], _context: &MarketContext) -> Signal {
        let Some(features) = self.features(prices) else {
            return Signal::none(self.provider_id());
        };

        let (direction, confidence) = self.score(&features);

        tracing::debug!(
            model = ?self.model,
            price_vs_sma = features.price_vs_sma,
            rsi = features.rsi,
            macd = features.macd_ratio,
            momentum = features.momentum,
            %direction,
            confidence,
            "Trend prediction"
        );

        Signal::new(self.provider_id(), direction, confidence)
    }

    fn name(&self) -> &str {
        "Trend Predictor"
    }

    fn provider_id(&self) -> ProviderId {
        ProviderId::TrendPredictor
    }

    fn min_prices_required(&self) -> usize {
        self.lookback
    }
}

fn sign(condition: bool) -> f64 {
    if condition {
        1.0
    } else {
        -1.0
    }
}
