use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Price observation at a specific point in time
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PricePoint {
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

/// Direction emitted by a signal provider
///
/// Up/Long and Down/Short are equivalent votes. Hold and None abstain.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Long,
    Short,
    Hold,
    None,
}

/// Normalized vote derived from a [`Direction`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vote {
    Long,
    Short,
}

impl Direction {
    /// Collapse the provider vocabulary into a bullish/bearish vote
    pub fn vote(self) -> Option<Vote> {
        match self {
            Self::Up | Self::Long => Some(Vote::Long),
            Self::Down | Self::Short => Some(Vote::Short),
            Self::Hold | Self::None => None,
        }
    }

    pub fn is_actionable(self) -> bool {
        self.vote().is_some()
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Up => "UP",
            Self::Down => "DOWN",
            Self::Long => "LONG",
            Self::Short => "SHORT",
            Self::Hold => "HOLD",
            Self::None => "NONE",
        };
        f.write_str(s)
    }
}

/// Identifies which provider produced a signal
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ProviderId {
    TrendPredictor,
    Confluence,
    MeanReversion,
    Reinforcement,
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::TrendPredictor => "trend",
            Self::Confluence => "confluence",
            Self::MeanReversion => "mean_reversion",
            Self::Reinforcement => "reinforcement",
        };
        f.write_str(s)
    }
}

/// Output of a single signal provider
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Signal {
    pub direction: Direction,
    pub confidence: f64,
    pub provider: ProviderId,
}

impl Signal {
    /// Confidence is clamped into [0, 1]
    pub fn new(provider: ProviderId, direction: Direction, confidence: f64) -> Self {
        Self {
            direction,
            confidence: clamp_unit(confidence),
            provider,
        }
    }

    /// "No signal": direction None with zero confidence
    pub fn none(provider: ProviderId) -> Self {
        Self {
            direction: Direction::None,
            confidence: 0.0,
            provider,
        }
    }

    pub fn is_none(&self) -> bool {
        self.direction == Direction::None
    }
}

/// Aggregated decision for one cycle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsensusResult {
    /// Always one of Up, Down or None
    pub direction: Direction,
    pub confidence: f64,
    pub per_provider: Vec<Signal>,
}

/// Order side
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One rung of the order ladder
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GridLevel {
    pub side: Side,
    pub price: f64,
    pub quantity: f64,
}

/// Order currently resting on the exchange, as reported by the gateway
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpenOrder {
    pub id: String,
    pub side: Side,
    pub price: f64,
    pub quantity: f64,
}

/// Acknowledgement of a successful placement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlacedOrder {
    pub id: String,
}

pub(crate) fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vote_normalization() {
        assert_eq!(Direction::Up.vote(), Some(Vote::Long));
        assert_eq!(Direction::Long.vote(), Some(Vote::Long));
        assert_eq!(Direction::Down.vote(), Some(Vote::Short));
        assert_eq!(Direction::Short.vote(), Some(Vote::Short));
        assert_eq!(Direction::Hold.vote(), None);
        assert_eq!(Direction::None.vote(), None);
    }

    #[test]
    fn test_signal_confidence_clamped() {
        let s = Signal::new(ProviderId::TrendPredictor, Direction::Up, 1.7);
        assert_eq!(s.confidence, 1.0);

        let s = Signal::new(ProviderId::TrendPredictor, Direction::Down, -0.2);
        assert_eq!(s.confidence, 0.0);

        let s = Signal::new(ProviderId::TrendPredictor, Direction::Down, f64::NAN);
        assert_eq!(s.confidence, 0.0);
    }

    #[test]
    fn test_none_signal() {
        let s = Signal::none(ProviderId::Confluence);
        assert!(s.is_none());
        assert_eq!(s.confidence, 0.0);
    }
}
