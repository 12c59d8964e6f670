use crate::auth::sign_request;
use crate::error::ApiError;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use configuration::ApiConfig;
use core_types::{Kline, OpenOrder, OrderRequest};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use rust_decimal::Decimal;
use serde::{Deserialize, de::DeserializeOwned};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

mod auth;
pub mod error;
pub mod responses;

// --- Public API ---
pub use responses::{ApiErrorResponse, AssetBalance, OpenOrderResponse, OrderResponse, ServerTimeResponse};

/// Binance caps a single klines request at this many bars.
pub const MAX_KLINES_PER_REQUEST: u16 = 1000;

const RECV_WINDOW_MS: &str = "5000";

/// The generic, abstract interface for a spot exchange API client.
/// This trait is the contract that the live engine uses, allowing the
/// underlying implementation (live or mock) to be swapped out.
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Checks that the REST API is reachable.
    async fn ping(&self) -> Result<(), ApiError>;

    /// The exchange's current time.
    async fn server_time(&self) -> Result<DateTime<Utc>, ApiError>;

    /// Fetches up to `limit` klines, oldest first, starting at `start_time`
    /// (or the most recent ones when `start_time` is `None`).
    async fn fetch_klines(
        &self,
        symbol: &str,
        interval: &str,
        start_time: Option<DateTime<Utc>>,
        limit: u16,
    ) -> Result<Vec<Kline>, ApiError>;

    /// Fetches the balances of all assets. (Authenticated)
    async fn get_account_balances(&self) -> Result<Vec<AssetBalance>, ApiError>;

    /// Fetches the orders resting on the book for `symbol`. (Authenticated)
    async fn get_open_orders(&self, symbol: &str) -> Result<Vec<OpenOrder>, ApiError>;

    /// Places a new order on the exchange. (Authenticated)
    async fn place_order(&self, order: &OrderRequest) -> Result<OrderResponse, ApiError>;

    /// Cancels every open order for `symbol`. (Authenticated)
    async fn cancel_open_orders(&self, symbol: &str) -> Result<(), ApiError>;
}

/// A concrete implementation of the `ApiClient` for the Binance spot exchange.
#[derive(Clone)]
pub struct BinanceClient {
    client: reqwest::Client,
    base_url: String,
    api_secret: String,
}

impl BinanceClient {
    /// Builds a client. Every request is bounded by `timeout`.
    pub fn new(api_config: &ApiConfig, timeout: Duration) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        if !api_config.key.is_empty() {
            let key = HeaderValue::from_str(&api_config.key)
                .map_err(|e| ApiError::InvalidData(format!("Invalid API key: {}", e)))?;
            headers.insert("X-MBX-APIKEY", key);
        }

        Ok(Self {
            client: reqwest::Client::builder()
                .default_headers(headers)
                .timeout(timeout)
                .build()?,
            base_url: api_config.base_url.trim_end_matches('/').to_string(),
            api_secret: api_config.secret.clone(),
        })
    }

    async fn get_public<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.get(&url).query(params).send().await?;
        let status = response.status();
        let text = response.text().await?;
        decode_response(status, &text)
    }

    async fn send_signed<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        mut params: BTreeMap<&str, String>,
    ) -> Result<T, ApiError> {
        params.insert("recvWindow", RECV_WINDOW_MS.to_string());
        params.insert("timestamp", Utc::now().timestamp_millis().to_string());

        let query_string =
            serde_qs::to_string(&params).map_err(|e| ApiError::Signing(e.to_string()))?;
        let signature = sign_request(&self.api_secret, &query_string)?;

        let url = format!(
            "{}{}?{}&signature={}",
            self.base_url, path, query_string, signature
        );

        let response = self.client.request(method, &url).send().await?;
        let status = response.status();
        let text = response.text().await?;
        decode_response(status, &text)
    }
}

/// Maps a raw HTTP response to the expected body or to the exchange's error payload.
fn decode_response<T: DeserializeOwned>(status: StatusCode, text: &str) -> Result<T, ApiError> {
    if status.is_success() {
        serde_json::from_str::<T>(text).map_err(|e| ApiError::Deserialization(e.to_string()))
    } else {
        let api_error: ApiErrorResponse = serde_json::from_str(text).map_err(|e| {
            ApiError::Deserialization(format!(
                "Failed to deserialize error response ({}): {}. Original text: {}",
                status, e, text
            ))
        })?;
        Err(ApiError::Exchange { code: api_error.code, msg: api_error.msg })
    }
}

// Intermediate struct for deserializing klines from Binance API
#[derive(Deserialize)]
struct RawKline(i64, String, String, String, String, String, i64, String, i64, String, String, String);

impl TryFrom<RawKline> for Kline {
    type Error = ApiError;

    fn try_from(raw: RawKline) -> Result<Self, Self::Error> {
        let decimal = |value: &str| {
            Decimal::from_str(value).map_err(|e| ApiError::Deserialization(e.to_string()))
        };
        let time = |millis: i64| {
            Utc.timestamp_millis_opt(millis)
                .single()
                .ok_or_else(|| ApiError::InvalidData(format!("Invalid timestamp: {}", millis)))
        };
        Ok(Kline {
            open_time: time(raw.0)?,
            open: decimal(&raw.1)?,
            high: decimal(&raw.2)?,
            low: decimal(&raw.3)?,
            close: decimal(&raw.4)?,
            volume: decimal(&raw.5)?,
            close_time: time(raw.6)?,
        })
    }
}

#[derive(Deserialize)]
struct Empty {}

#[async_trait]
impl ApiClient for BinanceClient {
    async fn ping(&self) -> Result<(), ApiError> {
        self.get_public::<Empty>("/api/v3/ping", &[]).await?;
        Ok(())
    }

    async fn server_time(&self) -> Result<DateTime<Utc>, ApiError> {
        let response: ServerTimeResponse = self.get_public("/api/v3/time", &[]).await?;
        Utc.timestamp_millis_opt(response.server_time)
            .single()
            .ok_or_else(|| ApiError::InvalidData(format!("Invalid server time: {}", response.server_time)))
    }

    async fn fetch_klines(
        &self,
        symbol: &str,
        interval: &str,
        start_time: Option<DateTime<Utc>>,
        limit: u16,
    ) -> Result<Vec<Kline>, ApiError> {
        let mut params = vec![
            ("symbol", symbol.to_string()),
            ("interval", interval.to_string()),
            ("limit", limit.min(MAX_KLINES_PER_REQUEST).to_string()),
        ];
        if let Some(start) = start_time {
            params.push(("startTime", start.timestamp_millis().to_string()));
        }

        let raw: Vec<RawKline> = self.get_public("/api/v3/klines", &params).await?;
        raw.into_iter().map(Kline::try_from).collect()
    }

    async fn get_account_balances(&self) -> Result<Vec<AssetBalance>, ApiError> {
        let account: responses::AccountResponse = self
            .send_signed(Method::GET, "/api/v3/account", BTreeMap::new())
            .await?;
        Ok(account.balances)
    }

    async fn get_open_orders(&self, symbol: &str) -> Result<Vec<OpenOrder>, ApiError> {
        let mut params = BTreeMap::new();
        params.insert("symbol", symbol.to_string());
        let orders: Vec<OpenOrderResponse> = self
            .send_signed(Method::GET, "/api/v3/openOrders", params)
            .await?;
        Ok(orders.into_iter().map(OpenOrder::from).collect())
    }

    async fn place_order(&self, order: &OrderRequest) -> Result<OrderResponse, ApiError> {
        let mut params = BTreeMap::new();
        params.insert("symbol", order.symbol.clone());
        params.insert("side", format!("{:?}", order.side).to_uppercase());
        params.insert("type", format!("{:?}", order.order_type).to_uppercase());
        params.insert("newClientOrderId", order.client_order_id.simple().to_string());
        match (order.quantity, order.quote_quantity) {
            (Some(quantity), None) => {
                params.insert("quantity", quantity.normalize().to_string());
            }
            (None, Some(quote)) => {
                params.insert("quoteOrderQty", quote.normalize().to_string());
            }
            _ => {
                return Err(ApiError::InvalidData(
                    "Order must set exactly one of quantity and quote quantity".to_string(),
                ));
            }
        }

        tracing::info!(symbol = %order.symbol, side = ?order.side, "Placing order");
        self.send_signed(Method::POST, "/api/v3/order", params).await
    }

    async fn cancel_open_orders(&self, symbol: &str) -> Result<(), ApiError> {
        let mut params = BTreeMap::new();
        params.insert("symbol", symbol.to_string());
        self.send_signed::<serde_json::Value>(Method::DELETE, "/api/v3/openOrders", params)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn raw_kline_converts_to_kline() {
        let json = r#"[[1499040000000,"0.01634790","0.80000000","0.01575800","0.01577100","148976.11427815",1499644799999,"2434.19055334",308,"1756.87402397","28.46694368","0"]]"#;
        let raw: Vec<RawKline> = serde_json::from_str(json).unwrap();
        let kline = Kline::try_from(raw.into_iter().next().unwrap()).unwrap();

        assert_eq!(kline.open_time.timestamp_millis(), 1499040000000);
        assert_eq!(kline.close, dec!(0.01577100));
        assert_eq!(kline.close_time.timestamp_millis(), 1499644799999);
    }

    #[test]
    fn error_payload_becomes_exchange_error() {
        let body = r#"{"code":-1121,"msg":"Invalid symbol."}"#;
        match decode_response::<serde_json::Value>(StatusCode::BAD_REQUEST, body) {
            Err(ApiError::Exchange { code, msg }) => {
                assert_eq!(code, -1121);
                assert_eq!(msg, "Invalid symbol.");
            }
            other => panic!("expected exchange error, got {other:?}"),
        }
    }

    #[test]
    fn account_balances_decode_from_strings() {
        let body = r#"{"makerCommission":15,"balances":[{"asset":"BTC","free":"0.5","locked":"0.25"}]}"#;
        let account: responses::AccountResponse = decode_response(StatusCode::OK, body).unwrap();
        assert_eq!(account.balances[0].total(), dec!(0.75));
    }

    #[test]
    fn open_orders_map_to_core_type() {
        let body = r#"[{"symbol":"BTCUSDT","orderId":7,"price":"64000.0","origQty":"0.01","executedQty":"0.0","side":"BUY","type":"LIMIT"}]"#;
        let orders: Vec<OpenOrderResponse> = decode_response(StatusCode::OK, body).unwrap();
        let order = OpenOrder::from(orders[0].clone());
        assert_eq!(order.order_id, 7);
        assert_eq!(order.side, core_types::OrderSide::Buy);
        assert_eq!(order.orig_qty, dec!(0.01));
    }
}
