use serde::{Deserialize, Serialize};

use crate::indicators::EPSILON;
use crate::models::{Direction, GridLevel, Side, Vote};

/// Which sides of a planned ladder get deployed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LadderMode {
    /// Both sides, regardless of direction
    #[default]
    Symmetric,
    /// Buys on a bullish decision, sells on a bearish one
    Directional,
}

/// A ladder around a mid price
#[derive(Debug, Clone, PartialEq)]
pub struct GridPlan {
    /// Ascending by price
    pub buys: Vec<GridLevel>,
    /// Descending by price
    pub sells: Vec<GridLevel>,
}

impl GridPlan {
    /// Levels to submit for a decision
    pub fn orders_for(&self, mode: LadderMode, direction: Direction) -> Vec<GridLevel> {
        match mode {
            LadderMode::Symmetric => self.buys.iter().chain(&self.sells).cloned().collect(),
            LadderMode::Directional => match direction.vote() {
                Some(Vote::Long) => self.buys.clone(),
                Some(Vote::Short) => self.sells.clone(),
                None => Vec::new(),
            },
        }
    }

    pub fn len(&self) -> usize {
        self.buys.len() + self.sells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buys.is_empty() && self.sells.is_empty()
    }
}

/// Symmetric price ladder generator
///
/// Level `i` (1-based) sits `width * i` away from the mid price on each side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPlanner {
    pub levels: usize,
    /// Fractional spacing between levels, e.g. 0.01 for 1%
    pub width: f64,
}

impl GridPlanner {
    pub fn new(levels: usize, width: f64) -> Self {
        Self { levels, width }
    }

    pub fn plan(&self, mid: f64, quantity: f64) -> GridPlan {
        let mut buys: Vec<GridLevel> = (1..=self.levels)
            .map(|i| GridLevel {
                side: Side::Buy,
                price: round2(mid * (1.0 - self.width * i as f64)),
                quantity,
            })
            .collect();
        buys.reverse();

        let mut sells: Vec<GridLevel> = (1..=self.levels)
            .map(|i| GridLevel {
                side: Side::Sell,
                price: round2(mid * (1.0 + self.width * i as f64)),
                quantity,
            })
            .collect();
        sells.reverse();

        GridPlan { buys, sells }
    }
}

/// Round to two decimals, the exchange price tick
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Round a quantity up to a whole number of lots, never below one lot
pub fn round_up_to_lot(quantity: f64, lot: f64) -> f64 {
    if lot <= 0.0 {
        return quantity;
    }
    // Absorb float noise so an exact multiple is not bumped a lot higher
    let lots = (quantity / lot - EPSILON).ceil().max(1.0);
    lots * lot
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prices(levels: &[GridLevel]) -> Vec<f64> {
        levels.iter().map(|l| l.price).collect()
    }

    #[test]
    fn test_plan_three_levels() {
        let plan = GridPlanner::new(3, 0.01).plan(100.0, 0.5);

        assert_eq!(prices(&plan.buys), vec![97.0, 98.0, 99.0]);
        assert_eq!(prices(&plan.sells), vec![103.0, 102.0, 101.0]);
        assert!(plan.buys.iter().all(|l| l.side == Side::Buy && l.quantity == 0.5));
        assert!(plan.sells.iter().all(|l| l.side == Side::Sell && l.quantity == 0.5));
        assert_eq!(plan.len(), 6);
    }

    #[test]
    fn test_plan_is_symmetric() {
        let plan = GridPlanner::new(3, 0.01).plan(100.0, 1.0);
        // Buys ascend and sells descend, so the i-th pair mirrors around the mid
        for (buy, sell) in plan.buys.iter().zip(&plan.sells) {
            assert!((buy.price + sell.price - 200.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_plan_rounds_prices() {
        let plan = GridPlanner::new(2, 0.003).plan(123.456, 1.0);
        // 123.456 * 0.994 = 122.715..., 123.456 * 1.006 = 124.196...
        assert_eq!(prices(&plan.buys), vec![122.72, 123.09]);
        assert_eq!(prices(&plan.sells), vec![124.20, 123.83]);
    }

    #[test]
    fn test_planner_is_idempotent() {
        let planner = GridPlanner::new(5, 0.0025);
        assert_eq!(planner.plan(2500.0, 0.1), planner.plan(2500.0, 0.1));
    }

    #[test]
    fn test_zero_levels_is_empty() {
        let plan = GridPlanner::new(0, 0.01).plan(100.0, 1.0);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_orders_for_modes() {
        let plan = GridPlanner::new(2, 0.01).plan(100.0, 1.0);

        assert_eq!(plan.orders_for(LadderMode::Symmetric, Direction::Down).len(), 4);

        let up = plan.orders_for(LadderMode::Directional, Direction::Up);
        assert_eq!(up.len(), 2);
        assert!(up.iter().all(|l| l.side == Side::Buy));

        let down = plan.orders_for(LadderMode::Directional, Direction::Down);
        assert!(down.iter().all(|l| l.side == Side::Sell));

        assert!(plan
            .orders_for(LadderMode::Directional, Direction::None)
            .is_empty());
    }

    #[test]
    fn test_round_up_to_lot() {
        assert!((round_up_to_lot(0.35, 0.1) - 0.4).abs() < 1e-9);
        assert!((round_up_to_lot(0.3, 0.1) - 0.3).abs() < 1e-9);
        assert_eq!(round_up_to_lot(0.0001, 1.0), 1.0);
        assert_eq!(round_up_to_lot(7.0, 1.0), 7.0);
    }
}
