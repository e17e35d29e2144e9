use crate::models::PricePoint;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// Rolling window of observed prices
///
/// Oldest prices are evicted once `capacity` is reached. Appending is the
/// only mutation.
#[derive(Debug, Clone)]
pub struct PriceHistory {
    points: VecDeque<PricePoint>,
    capacity: usize,
}

impl PriceHistory {
    /// Create an empty history holding at most `capacity` prices
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record a price observed now
    pub fn append(&mut self, price: f64) {
        self.append_at(price, Utc::now());
    }

    pub fn append_at(&mut self, price: f64, timestamp: DateTime<Utc>) {
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(PricePoint { price, timestamp });
    }

    /// Owned copy of the window, oldest first
    pub fn snapshot(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.price).collect()
    }

    pub fn points(&self) -> impl Iterator<Item = &PricePoint> {
        self.points.iter()
    }

    pub fn latest(&self) -> Option<&PricePoint> {
        self.points.back()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_history() {
        let history = PriceHistory::new(100);
        assert_eq!(history.capacity(), 100);
        assert!(history.is_empty());
        assert!(history.latest().is_none());
    }

    #[test]
    fn test_append_and_snapshot() {
        let mut history = PriceHistory::new(10);
        history.append(100.0);
        history.append(101.0);

        assert_eq!(history.snapshot(), vec![100.0, 101.0]);
        assert_eq!(history.latest().unwrap().price, 101.0);
    }

    #[test]
    fn test_evicts_oldest() {
        let mut history = PriceHistory::new(3);
        for price in [1.0, 2.0, 3.0, 4.0, 5.0] {
            history.append(price);
            assert!(history.len() <= 3);
        }
        assert_eq!(history.snapshot(), vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut history = PriceHistory::new(5);
        history.append(1.0);
        let snapshot = history.snapshot();
        history.append(2.0);
        assert_eq!(snapshot, vec![1.0]);
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_timestamps_preserved() {
        let mut history = PriceHistory::new(5);
        let t0 = Utc::now();
        history.append_at(50.0, t0);
        assert_eq!(history.points().next().unwrap().timestamp, t0);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut history = PriceHistory::new(0);
        history.append(1.0);
        history.append(2.0);
        assert_eq!(history.snapshot(), vec![2.0]);
    }
}
