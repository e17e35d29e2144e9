pub mod delta;
pub mod paper;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::models::{OpenOrder, PlacedOrder, Side};

pub use delta::{Credentials, DeltaClient};
pub use paper::PaperGateway;

/// Exchange operations the trading loop depends on
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    /// Available balance in quote currency
    async fn get_balance(&self) -> Result<f64, GatewayError>;

    /// Last traded price for `symbol`
    async fn get_price(&self, symbol: &str) -> Result<f64, GatewayError>;

    async fn get_open_orders(&self, symbol: &str) -> Result<Vec<OpenOrder>, GatewayError>;

    /// Submit a limit order
    async fn place_order(
        &self,
        symbol: &str,
        side: Side,
        price: f64,
        quantity: f64,
    ) -> Result<PlacedOrder, GatewayError>;

    async fn cancel_order(&self, id: &str) -> Result<(), GatewayError>;
}

/// Bound a gateway call, mapping an elapsed deadline to [`GatewayError::Timeout`]
pub async fn with_timeout<T, F>(
    op: &'static str,
    limit: Duration,
    fut: F,
) -> Result<T, GatewayError>
where
    F: Future<Output = Result<T, GatewayError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(GatewayError::Timeout(op)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_with_timeout_elapses() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok::<_, GatewayError>(1.0)
        };
        let result = with_timeout("get_price", Duration::from_secs(10), slow).await;
        assert!(matches!(result, Err(GatewayError::Timeout("get_price"))));
    }

    #[tokio::test]
    async fn test_with_timeout_passes_result() {
        let result = with_timeout("get_balance", Duration::from_secs(1), async {
            Ok::<_, GatewayError>(42.0)
        })
        .await;
        assert_eq!(result.unwrap(), 42.0);
    }
}
