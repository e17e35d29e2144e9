use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;

use crate::api::{with_timeout, ExchangeGateway};
use crate::error::GatewayError;
use crate::models::{GridLevel, PlacedOrder, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Placed,
    Cancelled,
    Failed,
}

impl OrderStatus {
    /// Pending -> Placed | Failed, Placed -> Cancelled | Failed
    pub fn can_become(self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Placed)
                | (Self::Pending, Self::Failed)
                | (Self::Placed, Self::Cancelled)
                | (Self::Placed, Self::Failed)
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderRecord {
    /// Exchange id, empty while pending
    pub id: String,
    pub side: Side,
    pub price: f64,
    pub quantity: f64,
    pub placed_at: DateTime<Utc>,
    pub status: OrderStatus,
}

impl OrderRecord {
    fn pending(level: &GridLevel) -> Self {
        Self {
            id: String::new(),
            side: level.side,
            price: level.price,
            quantity: level.quantity,
            placed_at: Utc::now(),
            status: OrderStatus::Pending,
        }
    }

    /// Apply a lifecycle transition, returns false if it is not allowed
    pub fn transition(&mut self, next: OrderStatus) -> bool {
        if self.status.can_become(next) {
            self.status = next;
            true
        } else {
            tracing::warn!(id = %self.id, from = ?self.status, to = ?next, "Illegal order transition");
            false
        }
    }
}

/// Outcome counts of one cancel-then-place pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LadderReport {
    pub cancelled: usize,
    pub cancel_failed: usize,
    pub placed: usize,
    pub place_failed: usize,
    /// Open orders could not be listed, only locally tracked ids were cancelled
    pub open_orders_unknown: bool,
}

impl LadderReport {
    pub fn is_clean(&self) -> bool {
        self.cancel_failed == 0 && self.place_failed == 0 && !self.open_orders_unknown
    }
}

/// Cancel-then-place reconciliation of the order ladder
///
/// Keeps a local map of orders this process placed, keyed by exchange id.
/// Only successfully placed orders enter the map; superseded ones leave it.
#[derive(Debug)]
pub struct OrderLifecycleController {
    orders: HashMap<String, OrderRecord>,
    settle_delay: Duration,
    request_timeout: Duration,
}

impl OrderLifecycleController {
    pub fn new(settle_delay: Duration, request_timeout: Duration) -> Self {
        Self {
            orders: HashMap::new(),
            settle_delay,
            request_timeout,
        }
    }

    /// Orders placed by this process that have not been superseded
    pub fn open_orders(&self) -> impl Iterator<Item = &OrderRecord> {
        self.orders.values()
    }

    pub fn get(&self, id: &str) -> Option<&OrderRecord> {
        self.orders.get(id)
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Replace whatever is resting on `symbol` with `levels`
    ///
    /// Individual cancel or place failures are logged and counted, never
    /// propagated.
    pub async fn replace_ladder<G>(
        &mut self,
        gateway: &G,
        symbol: &str,
        levels: &[GridLevel],
    ) -> LadderReport
    where
        G: ExchangeGateway + ?Sized,
    {
        let mut report = self.cancel_everything(gateway, symbol).await;

        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }

        let timeout = self.request_timeout;
        let placements = levels.iter().map(|level| async move {
            let mut record = OrderRecord::pending(level);
            let result = with_timeout(
                "place_order",
                timeout,
                gateway.place_order(symbol, level.side, level.price, level.quantity),
            )
            .await;
            (record_outcome(&mut record, result), record)
        });

        for (ok, record) in join_all(placements).await {
            if ok {
                report.placed += 1;
                self.orders.insert(record.id.clone(), record);
            } else {
                report.place_failed += 1;
            }
        }

        tracing::info!(
            symbol,
            cancelled = report.cancelled,
            cancel_failed = report.cancel_failed,
            placed = report.placed,
            place_failed = report.place_failed,
            "Ladder replaced"
        );

        report
    }

    /// Cancel every open order on `symbol` and everything tracked locally
    pub async fn cancel_all<G>(&mut self, gateway: &G, symbol: &str) -> LadderReport
    where
        G: ExchangeGateway + ?Sized,
    {
        let report = self.cancel_everything(gateway, symbol).await;
        tracing::info!(
            symbol,
            cancelled = report.cancelled,
            cancel_failed = report.cancel_failed,
            "Cancelled all orders"
        );
        report
    }

    async fn cancel_everything<G>(&mut self, gateway: &G, symbol: &str) -> LadderReport
    where
        G: ExchangeGateway + ?Sized,
    {
        let mut report = LadderReport::default();
        let timeout = self.request_timeout;

        let mut ids: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        match with_timeout("get_open_orders", timeout, gateway.get_open_orders(symbol)).await {
            Ok(open) => {
                for order in open {
                    if seen.insert(order.id.clone()) {
                        ids.push(order.id);
                    }
                }
            }
            Err(e) => {
                tracing::warn!(symbol, error = %e, "Failed to list open orders");
                report.open_orders_unknown = true;
            }
        }

        // Local ids only stand in for the exchange when its listing is missing
        if report.open_orders_unknown {
            for id in self.orders.keys() {
                if seen.insert(id.clone()) {
                    ids.push(id.clone());
                }
            }
        }

        let cancels = ids.iter().map(|id| async move {
            let result = with_timeout("cancel_order", timeout, gateway.cancel_order(id)).await;
            (id, result)
        });

        for (id, result) in join_all(cancels).await {
            match result {
                Ok(()) => report.cancelled += 1,
                Err(e) => {
                    tracing::warn!(%id, error = %e, "Cancel failed");
                    report.cancel_failed += 1;
                }
            }
        }

        // Tracked orders are superseded whether or not the cancel landed
        for (_, mut record) in self.orders.drain() {
            record.transition(OrderStatus::Cancelled);
        }

        report
    }
}

fn record_outcome(record: &mut OrderRecord, result: Result<PlacedOrder, GatewayError>) -> bool {
    match result {
        Ok(placed) => {
            record.id = placed.id;
            record.placed_at = Utc::now();
            record.transition(OrderStatus::Placed);
            tracing::debug!(
                id = %record.id,
                side = %record.side,
                price = record.price,
                quantity = record.quantity,
                "Order placed"
            );
            true
        }
        Err(e) => {
            record.transition(OrderStatus::Failed);
            tracing::warn!(
                side = %record.side,
                price = record.price,
                quantity = record.quantity,
                error = %e,
                "Order placement failed"
            );
            false
        }
    }
}
