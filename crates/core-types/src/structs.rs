use crate::enums::{Direction, OrderSide, OrderType, PositionStatus, PriceColumn};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One row of model output: the buy/sell propensity scores for a single bar.
///
/// Any score may be missing. A missing or NaN score never satisfies a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreSample {
    pub timestamp: DateTime<Utc>,
    pub buy_score: Option<f64>,
    pub buy_score_2: Option<f64>,
    pub sell_score: Option<f64>,
    pub sell_score_2: Option<f64>,
}

impl ScoreSample {
    /// A sample carrying only the primary buy and sell scores.
    pub fn new(timestamp: DateTime<Utc>, buy_score: f64, sell_score: f64) -> Self {
        Self {
            timestamp,
            buy_score: Some(buy_score),
            buy_score_2: None,
            sell_score: Some(sell_score),
            sell_score_2: None,
        }
    }
}

/// The boolean decision derived from a single `ScoreSample`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    pub is_buy: bool,
    pub is_sell: bool,
}

impl Signal {
    pub const NONE: Signal = Signal { is_buy: false, is_sell: false };

    pub fn new(is_buy: bool, is_sell: bool) -> Self {
        Self { is_buy, is_sell }
    }
}

/// A round trip produced by the trade simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub open_time: DateTime<Utc>,
    pub open_price: f64,
    pub close_time: DateTime<Utc>,
    pub close_price: f64,
    pub direction: Direction,
    /// Return of the round trip in percent, e.g. `-1.0` for a 1% loss.
    pub profit_pct: f64,
    /// Set when the position was still open at the end of the series and was
    /// closed at the final price only to measure it.
    pub forced: bool,
}

impl Trade {
    pub fn new(
        direction: Direction,
        open_time: DateTime<Utc>,
        open_price: f64,
        close_time: DateTime<Utc>,
        close_price: f64,
        forced: bool,
    ) -> Self {
        let profit = match direction {
            Direction::Long => close_price - open_price,
            Direction::Short => open_price - close_price,
        };
        Self {
            open_time,
            open_price,
            close_time,
            close_price,
            direction,
            profit_pct: 100.0 * profit / open_price,
            forced,
        }
    }
}

/// A single OHLCV bar as delivered by the exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kline {
    pub open_time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub close_time: DateTime<Utc>,
}

impl Kline {
    pub fn price(&self, column: PriceColumn) -> Decimal {
        match column {
            PriceColumn::Open => self.open,
            PriceColumn::High => self.high,
            PriceColumn::Low => self.low,
            PriceColumn::Close => self.close,
        }
    }

    /// A bar is final once its close time has passed.
    pub fn is_closed_at(&self, now: DateTime<Utc>) -> bool {
        self.close_time < now
    }
}

/// An order resting on the exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenOrder {
    pub order_id: i64,
    pub side: OrderSide,
    pub price: Decimal,
    pub orig_qty: Decimal,
    pub executed_qty: Decimal,
}

/// A request to place a new order.
///
/// Market buys on spot are sized in quote currency, so exactly one of
/// `quantity` and `quote_quantity` is expected to be set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub client_order_id: Uuid,
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: Option<Decimal>,
    pub quote_quantity: Option<Decimal>,
}

impl OrderRequest {
    pub fn market_by_quantity(symbol: &str, side: OrderSide, quantity: Decimal) -> Self {
        Self {
            client_order_id: Uuid::new_v4(),
            symbol: symbol.to_string(),
            side,
            order_type: OrderType::Market,
            quantity: Some(quantity),
            quote_quantity: None,
        }
    }

    pub fn market_by_quote(symbol: &str, side: OrderSide, quote_quantity: Decimal) -> Self {
        Self {
            client_order_id: Uuid::new_v4(),
            symbol: symbol.to_string(),
            side,
            order_type: OrderType::Market,
            quantity: None,
            quote_quantity: Some(quote_quantity),
        }
    }
}

/// The live account state for the traded symbol.
///
/// Owned by the live scheduler and replaced only at the end of a completed cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeStatus {
    pub status: PositionStatus,
    pub base_quantity: Decimal,
    pub quote_quantity: Decimal,
    pub open_orders: Vec<OpenOrder>,
}
