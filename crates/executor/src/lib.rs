//! # Executor Crate
//!
//! Carries out the position transitions decided by the live engine and reports
//! the resulting account state.
//!
//! ## Architectural Principles
//!
//! - **Decision vs. Execution Decoupling:** The engine decides *what* to do with the
//!   shared position state machine; an executor only knows *how* to do it on a
//!   given venue. It never decides whether to trade.
//! - **Execution Abstraction:** The `TradeExecutor` trait lets the engine run against
//!   the live spot account or an in-memory paper account without knowing which.
//! - **State Comes Back:** Every call returns a fresh `TradeStatus`. The caller owns
//!   the status and decides when to commit it.
//!
//! ## Public API
//!
//! - `TradeExecutor`: The core trait for all execution venues.
//! - `LiveExecutor`: Market orders on the spot exchange through the `ApiClient`.
//! - `PaperExecutor`: A simulated account for dry runs.
//! - `ExecutorError`: The specific error types that can be returned from this crate.

pub mod error;
pub mod exchange;
pub mod portfolio;

pub use error::ExecutorError;
pub use exchange::{LiveExecutor, TradeExecutor, fetch_trade_status};
pub use portfolio::PaperExecutor;
