//! Historical replay of a signal rule.
//!
//! `data_handler` loads the score table into a `SignalFrame`; `simulator` runs the
//! Flat/Long/Short state machine over it and hands the trades to the analytics engine.

pub mod data_handler;
pub mod error;
pub mod simulator;

pub use data_handler::{FrameOptions, SignalFrame, load_signal_frame, parse_timestamp};
pub use error::BacktestError;
pub use simulator::{PositionState, SimulationOutcome, TradeSimulator};
