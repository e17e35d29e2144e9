use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use governor::{Quota, RateLimiter};
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use sha2::Sha256;

use crate::api::ExchangeGateway;
use crate::error::{ConfigError, GatewayError};
use crate::grid::round2;
use crate::models::{OpenOrder, PlacedOrder, Side};

pub const DELTA_API_BASE: &str = "https://api.delta.exchange";
const API_PREFIX: &str = "/v2";

type HmacSha256 = Hmac<Sha256>;

type DeltaRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// API key pair used to sign private requests
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// Read `DELTA_API_KEY` and `DELTA_API_SECRET`
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = non_empty_env("DELTA_API_KEY")?;
        let api_secret = non_empty_env("DELTA_API_SECRET")?;
        Ok(Self::new(api_key, api_secret))
    }

    /// Hex HMAC-SHA256 over `timestamp.METHOD.path[.body]`
    pub fn sign(
        &self,
        timestamp: &str,
        method: &str,
        path: &str,
        body: &str,
    ) -> Result<String, GatewayError> {
        let mut message = format!("{}.{}.{}", timestamp, method, path);
        if !body.is_empty() {
            message.push('.');
            message.push_str(body);
        }

        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .map_err(|e| GatewayError::Signing(e.to_string()))?;
        mac.update(message.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

fn non_empty_env(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingCredential(name)),
    }
}

/// `{ "data": ... }` response wrapper
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(alias = "result")]
    data: T,
}

#[derive(Debug, Deserialize)]
struct BalanceData {
    #[serde(deserialize_with = "lenient_f64")]
    available_balance: f64,
}

#[derive(Debug, Deserialize)]
struct TickerData {
    #[serde(deserialize_with = "lenient_f64")]
    last_price: f64,
}

#[derive(Debug, Deserialize)]
struct OrderData {
    #[serde(deserialize_with = "lenient_string")]
    id: String,
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    side: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    price: Option<f64>,
    #[serde(default, alias = "size", deserialize_with = "lenient_opt_f64")]
    quantity: Option<f64>,
}

/// Numbers may arrive as JSON numbers or numeric strings
fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| serde::de::Error::custom("number out of range")),
        Value::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
        other => Err(serde::de::Error::custom(format!(
            "expected number, got {}",
            other
        ))),
    }
}

fn lenient_opt_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(n.as_f64()),
        Value::String(s) => Ok(s.trim().parse().ok()),
        _ => Ok(None),
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected id, got {}",
            other
        ))),
    }
}

/// Delta Exchange REST client
///
/// Cloneable; clones share the HTTP connection pool and rate limiter.
/// Private endpoints need [`Credentials`], the public ticker does not.
#[derive(Clone)]
pub struct DeltaClient {
    client: Client,
    base_url: String,
    credentials: Option<Credentials>,
    rate_limiter: Arc<DeltaRateLimiter>,
}

impl DeltaClient {
    pub fn new(
        base_url: impl Into<String>,
        credentials: Option<Credentials>,
        timeout: Duration,
        requests_per_second: u32,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder().timeout(timeout).build()?;

        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_second(rps)));

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            rate_limiter,
        })
    }

    /// Client for public market data only
    pub fn public(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GatewayError> {
        Self::new(base_url, None, timeout, 5)
    }

    /// Send a request and unwrap the `data` envelope
    ///
    /// `endpoint` is relative to `/v2`; `query` is encoded by reqwest and the
    /// signature covers the path and query of the final URL.
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, &str)],
        body: Option<Value>,
        signed: bool,
    ) -> Result<T, GatewayError> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}{}{}", self.base_url, API_PREFIX, endpoint);
        let body = body.map(|b| b.to_string()).unwrap_or_default();

        let mut builder = self
            .client
            .request(method.clone(), &url)
            .query(query)
            .header(CONTENT_TYPE, "application/json");
        if !body.is_empty() {
            builder = builder.body(body.clone());
        }
        let mut request = builder.build()?;
        let path = signature_path(request.url());

        if signed {
            let credentials = self
                .credentials
                .as_ref()
                .ok_or_else(|| GatewayError::Unavailable("api credentials".to_string()))?;
            let timestamp = Utc::now().timestamp_millis().to_string();
            let signature = credentials.sign(&timestamp, method.as_str(), &path, &body)?;

            let headers = request.headers_mut();
            headers.insert("api-key", header_value(&credentials.api_key)?);
            headers.insert("signature", header_value(&signature)?);
            headers.insert("timestamp", header_value(&timestamp)?);
        }

        let response = self.client.execute(request).await?;
        let status = response.status();

        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::warn!(%method, %path, status = status.as_u16(), "Delta API error");
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let bytes = response.bytes().await?;
        let envelope: Envelope<T> = serde_json::from_slice(&bytes)?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl ExchangeGateway for DeltaClient {
    async fn get_balance(&self) -> Result<f64, GatewayError> {
        let data: BalanceData = self
            .request(Method::GET, "/account/balance", &[], None, true)
            .await?;
        Ok(data.available_balance)
    }

    async fn get_price(&self, symbol: &str) -> Result<f64, GatewayError> {
        let tickers: Vec<TickerData> = self
            .request(
                Method::GET,
                "/public/tickers",
                &[("symbol", symbol)],
                None,
                false,
            )
            .await?;

        match tickers.first() {
            Some(ticker) if ticker.last_price > 0.0 => Ok(ticker.last_price),
            _ => Err(GatewayError::Unavailable(format!("{} price", symbol))),
        }
    }

    async fn get_open_orders(&self, symbol: &str) -> Result<Vec<OpenOrder>, GatewayError> {
        let orders: Vec<OrderData> = self
            .request(Method::GET, "/orders/active", &[], None, true)
            .await?;

        Ok(orders
            .into_iter()
            .filter(|o| o.symbol.as_deref() == Some(symbol))
            .map(|o| OpenOrder {
                side: match o.side.as_deref().map(str::to_ascii_lowercase).as_deref() {
                    Some("sell") => Side::Sell,
                    _ => Side::Buy,
                },
                price: o.price.unwrap_or(0.0),
                quantity: o.quantity.unwrap_or(0.0),
                id: o.id,
            })
            .collect())
    }

    async fn place_order(
        &self,
        symbol: &str,
        side: Side,
        price: f64,
        quantity: f64,
    ) -> Result<PlacedOrder, GatewayError> {
        let payload = json!({
            "symbol": symbol,
            "side": side.as_str().to_uppercase(),
            "quantity": quantity,
            "price": round2(price),
            "order_type": "limit",
        });

        let order: OrderData = self
            .request(Method::POST, "/orders", &[], Some(payload), true)
            .await?;
        Ok(PlacedOrder { id: order.id })
    }

    async fn cancel_order(&self, id: &str) -> Result<(), GatewayError> {
        let endpoint = format!("/orders/{}", id);
        let _: Option<Value> = self
            .request(Method::DELETE, &endpoint, &[], None, true)
            .await?;
        Ok(())
    }
}

/// Path plus query as sent, the form the signature is computed over
fn signature_path(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

fn header_value(value: &str) -> Result<HeaderValue, GatewayError> {
    HeaderValue::from_str(value).map_err(|e| GatewayError::Signing(e.to_string()))
}
