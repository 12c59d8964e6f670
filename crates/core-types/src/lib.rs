pub mod enums;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{Direction, OrderSide, OrderType, PositionStatus, PriceColumn, RuleKind, Transition};
pub use structs::{Kline, OpenOrder, OrderRequest, ScoreSample, Signal, Trade, TradeStatus};
