use crate::error::ExecutorError;
use api_client::ApiClient;
use async_trait::async_trait;
use configuration::TraderConfig;
use core_types::{Direction, OrderRequest, OrderSide, PositionStatus, TradeStatus, Transition};
use rust_decimal::{Decimal, RoundingStrategy};
use std::sync::Arc;

/// Quote amounts are sent with this many decimals.
const QUOTE_PRECISION: u32 = 2;

/// Rounds a quantity down to the exchange's step precision.
fn round_quantity_down(quantity: Decimal, precision: u32) -> Decimal {
    quantity.round_dp_with_strategy(precision, RoundingStrategy::ToZero)
}

/// A generic trait for an execution venue.
///
/// This trait allows the live engine to be agnostic about whether it is talking
/// to the exchange or to a paper account.
#[async_trait]
pub trait TradeExecutor: Send + Sync {
    /// Reads the current balances and open orders into a `TradeStatus`.
    async fn reconcile(&self) -> Result<TradeStatus, ExecutorError>;

    /// Carries out `transition` at roughly `price` and returns the account state
    /// afterwards. `Hold` returns `status` unchanged without any request.
    async fn execute(
        &self,
        transition: Transition,
        price: Decimal,
        status: &TradeStatus,
    ) -> Result<TradeStatus, ExecutorError>;
}

/// Reads balances and open orders for the traded pair.
///
/// A base balance at or above `min_base_quantity` counts as an open long;
/// anything smaller is dust.
pub async fn fetch_trade_status(
    api_client: &dyn ApiClient,
    symbol: &str,
    config: &TraderConfig,
) -> Result<TradeStatus, ExecutorError> {
    let balances = api_client.get_account_balances().await?;
    let open_orders = api_client.get_open_orders(symbol).await?;

    let find = |asset: &str| balances.iter().find(|b| b.asset.eq_ignore_ascii_case(asset));
    let base_quantity = find(&config.base_asset).map(|b| b.total()).unwrap_or_default();
    let quote_quantity = find(&config.quote_asset).map(|b| b.free).unwrap_or_default();

    let status = if base_quantity >= config.min_base_quantity {
        PositionStatus::Long
    } else {
        PositionStatus::Idle
    };

    Ok(TradeStatus { status, base_quantity, quote_quantity, open_orders })
}

/// The "live" executor that sends real market orders to the exchange via the ApiClient.
///
/// Spot accounts can only hold the base asset, so only long positions are supported.
pub struct LiveExecutor {
    api_client: Arc<dyn ApiClient>,
    symbol: String,
    config: TraderConfig,
}

impl LiveExecutor {
    pub fn new(api_client: Arc<dyn ApiClient>, symbol: &str, config: TraderConfig) -> Self {
        Self {
            api_client,
            symbol: symbol.to_string(),
            config,
        }
    }

    fn open_long(&self, status: &TradeStatus) -> Result<OrderRequest, ExecutorError> {
        let quote = (status.quote_quantity * self.config.quote_fraction)
            .round_dp_with_strategy(QUOTE_PRECISION, RoundingStrategy::ToZero);
        if quote <= Decimal::ZERO {
            return Err(ExecutorError::InsufficientFunds(format!(
                "{} {} available",
                status.quote_quantity, self.config.quote_asset
            )));
        }
        Ok(OrderRequest::market_by_quote(&self.symbol, OrderSide::Buy, quote))
    }

    fn close_long(&self, status: &TradeStatus) -> Result<OrderRequest, ExecutorError> {
        let quantity = round_quantity_down(status.base_quantity, self.config.quantity_precision);
        if quantity <= Decimal::ZERO || quantity < self.config.min_base_quantity {
            return Err(ExecutorError::InsufficientFunds(format!(
                "{} {} is below the minimum order size",
                status.base_quantity, self.config.base_asset
            )));
        }
        Ok(OrderRequest::market_by_quantity(&self.symbol, OrderSide::Sell, quantity))
    }
}

#[async_trait]
impl TradeExecutor for LiveExecutor {
    async fn reconcile(&self) -> Result<TradeStatus, ExecutorError> {
        fetch_trade_status(self.api_client.as_ref(), &self.symbol, &self.config).await
    }

    async fn execute(
        &self,
        transition: Transition,
        price: Decimal,
        status: &TradeStatus,
    ) -> Result<TradeStatus, ExecutorError> {
        let order = match transition {
            Transition::Hold => return Ok(status.clone()),
            Transition::Open(Direction::Long) => self.open_long(status)?,
            Transition::Close(Direction::Long) => self.close_long(status)?,
            Transition::Open(Direction::Short) | Transition::Close(Direction::Short) => {
                return Err(ExecutorError::Unsupported(
                    "short positions cannot be held on a spot account".to_string(),
                ));
            }
        };

        // Leftover orders would lock balances the new order needs.
        if !status.open_orders.is_empty() {
            tracing::warn!(count = status.open_orders.len(), "Cancelling open orders before trading");
            self.api_client.cancel_open_orders(&self.symbol).await?;
        }

        let response = self.api_client.place_order(&order).await?;
        tracing::info!(
            order_id = response.order_id,
            side = ?order.side,
            status = %response.status,
            executed_qty = %response.executed_qty,
            reference_price = %price,
            "Order placed"
        );

        self.reconcile().await
    }
}
