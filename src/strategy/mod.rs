// Signal provider module
pub mod confluence;
pub mod consensus;
pub mod mean_reversion;
pub mod reinforcement;
pub mod trend_predictor;

pub use confluence::{ConfluenceConfig, ConfluenceTrader, Horizon};
pub use consensus::{ConsensusEngine, SignalEnsemble};
pub use mean_reversion::{MeanReversionConfig, MeanReversionTrader};
pub use reinforcement::{Action, ActionValues, ReinforcementActionSelector, StateKey};
pub use trend_predictor::{TrendModel, TrendPredictor};

use crate::models::{ProviderId, Signal};

/// Account-level inputs a provider may consult besides prices
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MarketContext {
    pub capital: f64,
}

/// Base trait for all signal providers
///
/// Providers never fail: a window that is too short, or a market that
/// offers no setup, produces [`Signal::none`].
pub trait SignalProvider: Send + Sync {
    /// Generate a signal from a price window (oldest first)
    fn generate_signal(&self, prices: &[f64], context: &MarketContext) -> Signal;

    /// Get provider name
    fn name(&self) -> &str;

    fn provider_id(&self) -> ProviderId;

    /// Minimum prices required for this provider
    fn min_prices_required(&self) -> usize;

    fn has_enough_data(&self, prices: &[f64]) -> bool {
        prices.len() >= self.min_prices_required()
    }
}
