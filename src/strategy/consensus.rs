use crate::models::{ConsensusResult, Direction, Signal, Vote};
use crate::strategy::{
    ConfluenceTrader, MarketContext, MeanReversionTrader, ReinforcementActionSelector,
    SignalProvider, TrendPredictor,
};

/// Majority-vote aggregation of provider signals
#[derive(Debug, Clone)]
pub struct ConsensusEngine {
    /// Agreeing votes needed for a direction
    pub min_votes: usize,
}

impl Default for ConsensusEngine {
    fn default() -> Self {
        Self { min_votes: 2 }
    }
}

impl ConsensusEngine {
    /// Reduce provider signals to one decision
    ///
    /// Up wins when it reaches `min_votes`, otherwise Down when it does,
    /// otherwise None. Confidence is the larger vote count over the number
    /// of providers.
    pub fn aggregate(&self, signals: Vec<Signal>) -> ConsensusResult {
        let long_votes = signals
            .iter()
            .filter(|s| s.direction.vote() == Some(Vote::Long))
            .count();
        let short_votes = signals
            .iter()
            .filter(|s| s.direction.vote() == Some(Vote::Short))
            .count();

        let direction = if long_votes >= self.min_votes {
            Direction::Up
        } else if short_votes >= self.min_votes {
            Direction::Down
        } else {
            Direction::None
        };

        let confidence = if signals.is_empty() {
            0.0
        } else {
            long_votes.max(short_votes) as f64 / signals.len() as f64
        };

        ConsensusResult {
            direction,
            confidence,
            per_provider: signals,
        }
    }
}

/// The four providers evaluated together, in fixed order
pub struct SignalEnsemble {
    trend: TrendPredictor,
    confluence: ConfluenceTrader,
    mean_reversion: MeanReversionTrader,
    reinforcement: ReinforcementActionSelector,
    engine: ConsensusEngine,
}

impl SignalEnsemble {
    pub fn new(
        trend: TrendPredictor,
        confluence: ConfluenceTrader,
        mean_reversion: MeanReversionTrader,
        reinforcement: ReinforcementActionSelector,
    ) -> Self {
        Self {
            trend,
            confluence,
            mean_reversion,
            reinforcement,
            engine: ConsensusEngine::default(),
        }
    }

    fn providers(&self) -> [&dyn SignalProvider; 4] {
        [
            &self.trend as &dyn SignalProvider,
            &self.confluence,
            &self.mean_reversion,
            &self.reinforcement,
        ]
    }

    /// Run every provider over the same snapshot and aggregate
    pub fn evaluate(&self, prices: &[f64], context: &MarketContext) -> ConsensusResult {
        let signals: Vec<Signal> = self
            .providers()
            .iter()
            .map(|p| p.generate_signal(prices, context))
            .collect();

        self.engine.aggregate(signals)
    }

    /// Longest lookback any provider needs
    pub fn max_lookback(&self) -> usize {
        self.providers()
            .iter()
            .map(|p| p.min_prices_required())
            .max()
            .unwrap_or(0)
    }

    /// Access to the value table for externally supplied rewards
    pub fn reinforcement_mut(&mut self) -> &mut ReinforcementActionSelector {
        &mut self.reinforcement
    }
}

impl Default for SignalEnsemble {
    fn default() -> Self {
        Self::new(
            TrendPredictor::default(),
            ConfluenceTrader::default(),
            MeanReversionTrader::default(),
            ReinforcementActionSelector::default(),
        )
    }
}
