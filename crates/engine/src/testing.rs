//! Mocks and fixtures shared by the engine's unit tests.

use alerter::Notifier;
use alerter::error::AlerterError;
use api_client::error::ApiError;
use api_client::{ApiClient, AssetBalance, OrderResponse};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use core_types::{Kline, OpenOrder, OrderRequest, TradeStatus, Transition};
use executor::{ExecutorError, TradeExecutor};
use mockall::mock;
use rust_decimal::Decimal;

mock! {
    pub Api {}

    #[async_trait]
    impl ApiClient for Api {
        async fn ping(&self) -> Result<(), ApiError>;
        async fn server_time(&self) -> Result<DateTime<Utc>, ApiError>;
        async fn fetch_klines(
            &self,
            symbol: &str,
            interval: &str,
            start_time: Option<DateTime<Utc>>,
            limit: u16,
        ) -> Result<Vec<Kline>, ApiError>;
        async fn get_account_balances(&self) -> Result<Vec<AssetBalance>, ApiError>;
        async fn get_open_orders(&self, symbol: &str) -> Result<Vec<OpenOrder>, ApiError>;
        async fn place_order(&self, order: &OrderRequest) -> Result<OrderResponse, ApiError>;
        async fn cancel_open_orders(&self, symbol: &str) -> Result<(), ApiError>;
    }
}

mock! {
    pub Executor {}

    #[async_trait]
    impl TradeExecutor for Executor {
        async fn reconcile(&self) -> Result<TradeStatus, ExecutorError>;
        async fn execute(
            &self,
            transition: Transition,
            price: Decimal,
            status: &TradeStatus,
        ) -> Result<TradeStatus, ExecutorError>;
    }
}

mock! {
    pub StatusNotifier {}

    #[async_trait]
    impl Notifier for StatusNotifier {
        async fn notify(&self, message: &str) -> Result<(), AlerterError>;
    }
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// The one-minute bar opening `minute` minutes after `t0`.
pub fn bar(minute: i64, close: f64) -> Kline {
    bar_at(t0() + Duration::minutes(minute), close)
}

pub fn bar_at(open_time: DateTime<Utc>, close: f64) -> Kline {
    let close = Decimal::try_from(close).unwrap();
    Kline {
        open_time,
        open: close,
        high: close,
        low: close,
        close,
        volume: Decimal::ONE,
        close_time: open_time + Duration::seconds(59) + Duration::milliseconds(999),
    }
}
