use std::collections::HashMap;
use std::fmt;

use crate::indicators::{calculate_momentum, mean, population_std_dev};
use crate::models::{Direction, ProviderId, Signal};
use crate::strategy::{MarketContext, SignalProvider};

/// Prices the state discretization looks at
const STATE_WINDOW: usize = 5;
/// Relative dispersion above which the market counts as "high" volatility
const HIGH_VOLATILITY: f64 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MomentumBucket {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VolatilityBucket {
    High,
    Low,
}

/// Discretized market state: momentum bucket × volatility bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateKey {
    pub momentum: MomentumBucket,
    pub volatility: VolatilityBucket,
}

impl StateKey {
    pub fn new(momentum: MomentumBucket, volatility: VolatilityBucket) -> Self {
        Self {
            momentum,
            volatility,
        }
    }

    /// Discretize the last five prices, `None` on a shorter window
    pub fn from_prices(prices: &[f64]) -> Option<Self> {
        if prices.len() < STATE_WINDOW {
            return None;
        }
        let window = &prices[prices.len() - STATE_WINDOW..];

        let momentum = calculate_momentum(window, STATE_WINDOW)?;
        let avg = mean(window)?;
        let volatility = if avg == 0.0 {
            0.0
        } else {
            population_std_dev(window)? / avg
        };

        Some(Self {
            momentum: if momentum > 0.0 {
                MomentumBucket::Up
            } else {
                MomentumBucket::Down
            },
            volatility: if volatility > HIGH_VOLATILITY {
                VolatilityBucket::High
            } else {
                VolatilityBucket::Low
            },
        })
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = match self.momentum {
            MomentumBucket::Up => "up",
            MomentumBucket::Down => "down",
        };
        let v = match self.volatility {
            VolatilityBucket::High => "high",
            VolatilityBucket::Low => "low",
        };
        write!(f, "{}_{}", m, v)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Long,
    Short,
    Hold,
}

impl Action {
    /// Fixed enumeration order, also the tie-break order
    pub const ALL: [Action; 3] = [Action::Long, Action::Short, Action::Hold];

    pub fn direction(self) -> Direction {
        match self {
            Self::Long => Direction::Long,
            Self::Short => Direction::Short,
            Self::Hold => Direction::Hold,
        }
    }
}

/// Value estimate per action for a single state
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ActionValues {
    pub long: f64,
    pub short: f64,
    pub hold: f64,
}

impl ActionValues {
    pub fn get(&self, action: Action) -> f64 {
        match action {
            Action::Long => self.long,
            Action::Short => self.short,
            Action::Hold => self.hold,
        }
    }

    fn get_mut(&mut self, action: Action) -> &mut f64 {
        match action {
            Action::Long => &mut self.long,
            Action::Short => &mut self.short,
            Action::Hold => &mut self.hold,
        }
    }

    /// Greedy choice; earlier actions in [`Action::ALL`] win ties
    pub fn best(&self) -> Action {
        let mut best = Action::Long;
        for action in Action::ALL {
            if self.get(action) > self.get(best) {
                best = action;
            }
        }
        best
    }

    pub fn max_value(&self) -> f64 {
        self.long.max(self.short).max(self.hold)
    }

    /// Gap between the best action and the runner-up
    fn margin(&self) -> f64 {
        let best = self.best();
        let runner_up = Action::ALL
            .iter()
            .filter(|&&a| a != best)
            .map(|&a| self.get(a))
            .fold(f64::NEG_INFINITY, f64::max);
        self.get(best) - runner_up
    }
}

/// Tabular Q-learning action selector
///
/// Reads are side-effect free: an unseen state behaves as all-zero values.
/// States are inserted explicitly by [`ReinforcementActionSelector::update`].
#[derive(Debug, Clone)]
pub struct ReinforcementActionSelector {
    q_table: HashMap<StateKey, ActionValues>,
    learning_rate: f64,
    discount: f64,
}

impl ReinforcementActionSelector {
    pub const DEFAULT_LEARNING_RATE: f64 = 0.1;
    pub const DISCOUNT: f64 = 0.99;

    pub fn new(learning_rate: f64) -> Self {
        Self {
            q_table: HashMap::new(),
            learning_rate,
            discount: Self::DISCOUNT,
        }
    }

    /// Current values for a state, defaults when never updated
    pub fn values(&self, state: &StateKey) -> ActionValues {
        self.q_table.get(state).copied().unwrap_or_default()
    }

    pub fn choose_action(&self, state: &StateKey) -> Action {
        self.values(state).best()
    }

    /// Temporal-difference update
    ///
    /// `Q(s,a) += α · (reward + γ · max Q(s') - Q(s,a))`
    pub fn update(&mut self, state: StateKey, action: Action, reward: f64, next_state: StateKey) {
        let max_next = self
            .q_table
            .entry(next_state)
            .or_default()
            .max_value();

        let values = self.q_table.entry(state).or_default();
        let current = values.get(action);
        *values.get_mut(action) =
            current + self.learning_rate * (reward + self.discount * max_next - current);

        tracing::debug!(
            %state,
            ?action,
            reward,
            value = values.get(action),
            "Updated action value"
        );
    }

    pub fn known_states(&self) -> usize {
        self.q_table.len()
    }
}

impl Default for ReinforcementActionSelector {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LEARNING_RATE)
    }
}

impl SignalProvider for ReinforcementActionSelector {
    fn generate_signal(&self, prices: &[f64], _context: &MarketContext) -> Signal {
        let Some(state) = StateKey::from_prices(prices) else {
            return Signal::none(self.provider_id());
        };

        let values = self.values(&state);
        let action = values.best();

        let confidence = match action {
            Action::Hold => 0.0,
            _ => logistic(values.margin()),
        };

        Signal::new(self.provider_id(), action.direction(), confidence)
    }

    fn name(&self) -> &str {
        "Reinforcement Selector"
    }

    fn provider_id(&self) -> ProviderId {
        ProviderId::Reinforcement
    }

    fn min_prices_required(&self) -> usize {
        STATE_WINDOW
    }
}

fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn up_low() -> StateKey {
        StateKey::new(MomentumBucket::Up, VolatilityBucket::Low)
    }

    fn down_high() -> StateKey {
        StateKey::new(MomentumBucket::Down, VolatilityBucket::High)
    }

    #[test]
    fn test_state_discretization() {
        let calm_rise = [100.0, 100.1, 100.2, 100.3, 100.4];
        assert_eq!(StateKey::from_prices(&calm_rise), Some(up_low()));

        let wild_drop = [120.0, 110.0, 100.0, 90.0, 80.0];
        assert_eq!(StateKey::from_prices(&wild_drop), Some(down_high()));

        assert_eq!(up_low().to_string(), "up_low");
        assert!(StateKey::from_prices(&[1.0, 2.0]).is_none());
    }

    #[test]
    fn test_flat_momentum_buckets_down() {
        let flat = [100.0; 5];
        let state = StateKey::from_prices(&flat).unwrap();
        assert_eq!(state.momentum, MomentumBucket::Down);
    }

    #[test]
    fn test_unseen_state_ties_break_to_long() {
        let selector = ReinforcementActionSelector::default();
        assert_eq!(selector.choose_action(&up_low()), Action::Long);
        // Reading does not insert
        assert_eq!(selector.known_states(), 0);
    }

    #[test]
    fn test_td_update() {
        let mut selector = ReinforcementActionSelector::default();
        selector.update(up_low(), Action::Short, 1.0, down_high());

        // 0 + 0.1 * (1.0 + 0.99 * 0 - 0) = 0.1
        let values = selector.values(&up_low());
        assert!((values.short - 0.1).abs() < 1e-12);
        assert_eq!(values.long, 0.0);
        assert_eq!(selector.known_states(), 2);
        assert_eq!(selector.choose_action(&up_low()), Action::Short);

        // Bootstraps from the next state's best value
        selector.update(down_high(), Action::Hold, 0.0, up_low());
        let values = selector.values(&down_high());
        assert!((values.hold - 0.1 * 0.99 * 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_negative_reward_moves_choice() {
        let mut selector = ReinforcementActionSelector::default();
        selector.update(up_low(), Action::Long, -1.0, up_low());
        // Long is now negative, Short and Hold tie at zero, Short comes first
        assert_eq!(selector.choose_action(&up_low()), Action::Short);
    }

    #[test]
    fn test_signal_from_prices() {
        let selector = ReinforcementActionSelector::default();
        let prices = [100.0, 100.1, 100.2, 100.3, 100.4];

        let signal = selector.generate_signal(&prices, &MarketContext::default());
        assert_eq!(signal.direction, Direction::Long);
        assert_eq!(signal.confidence, 0.5);
    }

    #[test]
    fn test_hold_signal_has_zero_confidence() {
        let mut selector = ReinforcementActionSelector::default();
        selector.update(up_low(), Action::Hold, 5.0, up_low());

        let prices = [100.0, 100.1, 100.2, 100.3, 100.4];
        let signal = selector.generate_signal(&prices, &MarketContext::default());
        assert_eq!(signal.direction, Direction::Hold);
        assert_eq!(signal.confidence, 0.0);
    }

    #[test]
    fn test_insufficient_data() {
        let selector = ReinforcementActionSelector::default();
        let signal = selector.generate_signal(&[100.0; 4], &MarketContext::default());
        assert!(signal.is_none());
        assert_eq!(signal.confidence, 0.0);
    }
}
