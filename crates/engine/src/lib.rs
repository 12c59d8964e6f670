//! # Live Engine
//!
//! Runs the trained threshold rule against the exchange on a fixed cadence.
//!
//! Startup is gated: provider health check, cold-start bar sync, then account
//! reconciliation. Only once all three succeed does the timer start. After that,
//! every tick runs one cycle (sync, score lookup, decision, execution, status
//! notification) and a failing cycle is logged and skipped.
//!
//! ## Public API
//!
//! - `AppContext`: The configuration and the collaborators the scheduler drives.
//! - `LiveScheduler`: Startup sequence and the tick loop.
//! - `ScoreSource` / `CsvScoreSource`: Where the model scores come from.

use alerter::Notifier;
use api_client::ApiClient;
use configuration::Config;
use executor::TradeExecutor;
use std::sync::Arc;
use strategies::SignalModel;

pub mod error;
pub mod health;
pub mod market;
pub mod scheduler;
pub mod scores;

#[cfg(test)]
mod testing;

pub use error::EngineError;
pub use health::{HealthState, check_provider};
pub use market::{BarBuffer, parse_interval};
pub use scheduler::LiveScheduler;
pub use scores::{CsvScoreSource, ScoreSource};

/// Everything a live run needs, built once at startup and owned by the scheduler.
#[derive(Clone)]
pub struct AppContext {
    pub config: Config,
    pub rule: Arc<dyn SignalModel>,
    pub api_client: Arc<dyn ApiClient>,
    pub scores: Arc<dyn ScoreSource>,
    pub executor: Arc<dyn TradeExecutor>,
    pub notifier: Arc<dyn Notifier>,
}
