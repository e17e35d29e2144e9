use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::api::{DeltaClient, ExchangeGateway};
use crate::error::GatewayError;
use crate::models::{OpenOrder, PlacedOrder, Side};

/// Replayed in order, the last price repeats once exhausted
#[derive(Default)]
struct PriceScript {
    queue: VecDeque<f64>,
    last: Option<f64>,
}

#[derive(Default)]
struct Faults {
    reject_side: Option<Side>,
    reject_cancels: bool,
    price_unavailable: bool,
    listing_unavailable: bool,
}

struct PaperState {
    balance: f64,
    /// order id -> (symbol, order)
    orders: HashMap<String, (String, OpenOrder)>,
    faults: Faults,
    placed_total: usize,
    cancelled_total: usize,
}

/// In-memory exchange for dry runs and tests
///
/// Orders rest forever; there is no matching and no fills.
pub struct PaperGateway {
    state: Mutex<PaperState>,
    script: Mutex<PriceScript>,
    /// Live ticker, takes precedence over the script
    live: Option<DeltaClient>,
}

impl PaperGateway {
    fn with_source(balance: f64, script: PriceScript, live: Option<DeltaClient>) -> Self {
        Self {
            state: Mutex::new(PaperState {
                balance,
                orders: HashMap::new(),
                faults: Faults::default(),
                placed_total: 0,
                cancelled_total: 0,
            }),
            script: Mutex::new(script),
            live,
        }
    }

    /// Fixed balance and a scripted price sequence
    pub fn scripted(balance: f64, prices: impl IntoIterator<Item = f64>) -> Self {
        let script = PriceScript {
            queue: prices.into_iter().collect(),
            last: None,
        };
        Self::with_source(balance, script, None)
    }

    /// Fixed balance with live prices from the public ticker
    pub fn live(balance: f64, client: DeltaClient) -> Self {
        Self::with_source(balance, PriceScript::default(), Some(client))
    }

    fn state(&self) -> MutexGuard<'_, PaperState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_balance(&self, balance: f64) {
        self.state().balance = balance;
    }

    /// Append prices to a scripted feed, ignored for live feeds
    pub fn push_prices(&self, more: impl IntoIterator<Item = f64>) {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .queue
            .extend(more);
    }

    /// Reject every order placed on `side`
    pub fn reject_side(&self, side: Option<Side>) {
        self.state().faults.reject_side = side;
    }

    pub fn reject_cancels(&self, reject: bool) {
        self.state().faults.reject_cancels = reject;
    }

    pub fn set_price_unavailable(&self, unavailable: bool) {
        self.state().faults.price_unavailable = unavailable;
    }

    /// Fail every open-orders listing
    pub fn set_listing_unavailable(&self, unavailable: bool) {
        self.state().faults.listing_unavailable = unavailable;
    }

    /// Take an order off the book as if it had traded, returns whether it rested
    pub fn fill_order(&self, id: &str) -> bool {
        self.state().orders.remove(id).is_some()
    }

    /// Resting orders for a symbol, sorted by price
    pub fn resting_orders(&self, symbol: &str) -> Vec<OpenOrder> {
        let mut orders: Vec<OpenOrder> = self
            .state()
            .orders
            .values()
            .filter(|(s, _)| s == symbol)
            .map(|(_, o)| o.clone())
            .collect();
        orders.sort_by(|a, b| a.price.total_cmp(&b.price));
        orders
    }

    /// Orders ever accepted
    pub fn placed_total(&self) -> usize {
        self.state().placed_total
    }

    /// Orders ever cancelled
    pub fn cancelled_total(&self) -> usize {
        self.state().cancelled_total
    }

    /// Rest an order without counting it as placed by the bot
    pub fn seed_order(&self, symbol: &str, side: Side, price: f64, quantity: f64) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.state().orders.insert(
            id.clone(),
            (
                symbol.to_string(),
                OpenOrder {
                    id: id.clone(),
                    side,
                    price,
                    quantity,
                },
            ),
        );
        id
    }
}

#[async_trait]
impl ExchangeGateway for PaperGateway {
    async fn get_balance(&self) -> Result<f64, GatewayError> {
        Ok(self.state().balance)
    }

    async fn get_price(&self, symbol: &str) -> Result<f64, GatewayError> {
        if self.state().faults.price_unavailable {
            return Err(GatewayError::Unavailable(format!("{} price", symbol)));
        }

        if let Some(client) = &self.live {
            return client.get_price(symbol).await;
        }

        let mut script = self.script.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(next) = script.queue.pop_front() {
            script.last = Some(next);
        }
        script
            .last
            .ok_or_else(|| GatewayError::Unavailable(format!("{} price", symbol)))
    }

    async fn get_open_orders(&self, symbol: &str) -> Result<Vec<OpenOrder>, GatewayError> {
        if self.state().faults.listing_unavailable {
            return Err(GatewayError::Unavailable(format!("{} open orders", symbol)));
        }
        Ok(self.resting_orders(symbol))
    }

    async fn place_order(
        &self,
        symbol: &str,
        side: Side,
        price: f64,
        quantity: f64,
    ) -> Result<PlacedOrder, GatewayError> {
        let mut state = self.state();
        if state.faults.reject_side == Some(side) {
            return Err(GatewayError::Rejected(format!(
                "{} orders disabled",
                side
            )));
        }
        if price <= 0.0 || quantity <= 0.0 {
            return Err(GatewayError::Rejected(format!(
                "invalid order {} @ {}",
                quantity, price
            )));
        }

        let id = uuid::Uuid::new_v4().to_string();
        state.orders.insert(
            id.clone(),
            (
                symbol.to_string(),
                OpenOrder {
                    id: id.clone(),
                    side,
                    price,
                    quantity,
                },
            ),
        );
        state.placed_total += 1;

        tracing::debug!(%id, %side, price, quantity, "Paper order placed");
        Ok(PlacedOrder { id })
    }

    async fn cancel_order(&self, id: &str) -> Result<(), GatewayError> {
        let mut state = self.state();
        if state.faults.reject_cancels {
            return Err(GatewayError::Rejected(format!("cancel {} refused", id)));
        }

        match state.orders.remove(id) {
            Some(_) => {
                state.cancelled_total += 1;
                Ok(())
            }
            None => Err(GatewayError::Status {
                status: 404,
                body: format!("order {} not found", id),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_prices_repeat_last() {
        let gateway = PaperGateway::scripted(1000.0, [100.0, 101.0]);
        assert_eq!(gateway.get_price("BTCUSD").await.unwrap(), 100.0);
        assert_eq!(gateway.get_price("BTCUSD").await.unwrap(), 101.0);
        assert_eq!(gateway.get_price("BTCUSD").await.unwrap(), 101.0);
    }

    #[tokio::test]
    async fn test_empty_script_is_unavailable() {
        let gateway = PaperGateway::scripted(1000.0, []);
        assert!(gateway.get_price("BTCUSD").await.is_err());
    }

    #[tokio::test]
    async fn test_place_and_cancel() {
        let gateway = PaperGateway::scripted(1000.0, [100.0]);
        let placed = gateway
            .place_order("BTCUSD", Side::Buy, 99.0, 1.0)
            .await
            .unwrap();
        gateway
            .place_order("ETHUSD", Side::Sell, 3000.0, 1.0)
            .await
            .unwrap();

        let open = gateway.get_open_orders("BTCUSD").await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, placed.id);

        gateway.cancel_order(&placed.id).await.unwrap();
        assert!(gateway.get_open_orders("BTCUSD").await.unwrap().is_empty());
        assert!(gateway.cancel_order(&placed.id).await.is_err());
        assert_eq!(gateway.cancelled_total(), 1);
    }

    #[tokio::test]
    async fn test_fault_injection() {
        let gateway = PaperGateway::scripted(1000.0, [100.0]);

        gateway.reject_side(Some(Side::Sell));
        assert!(gateway
            .place_order("BTCUSD", Side::Sell, 101.0, 1.0)
            .await
            .is_err());
        let placed = gateway
            .place_order("BTCUSD", Side::Buy, 99.0, 1.0)
            .await
            .unwrap();

        gateway.reject_cancels(true);
        assert!(gateway.cancel_order(&placed.id).await.is_err());

        gateway.set_price_unavailable(true);
        assert!(matches!(
            gateway.get_price("BTCUSD").await,
            Err(GatewayError::Unavailable(_))
        ));
    }
}
