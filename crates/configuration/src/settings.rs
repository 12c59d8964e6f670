use crate::error::ConfigError;
use crate::grid_config::TrainSignalModelConfig;
use core_types::{PriceColumn, RuleKind};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Name of the timestamp column in the score tables.
    #[serde(default = "default_time_column")]
    pub time_column: String,
    /// The traded symbol (e.g., "BTCUSDT"). Also names the data sub-folder.
    pub symbol: String,
    /// Root folder holding one sub-folder per symbol.
    pub data_folder: PathBuf,
    /// Score table file name, without the `.csv` extension.
    #[serde(default = "default_signal_file_name")]
    pub signal_file_name: String,
    /// Grid-search artifact file name, without the `.txt` extension.
    #[serde(default = "default_signal_models_file_name")]
    pub signal_models_file_name: String,
    #[serde(default)]
    pub columns: ScoreColumns,
    #[serde(default)]
    pub signal_model: SignalModelConfig,
    #[serde(default)]
    pub train_signal_model: TrainSignalModelConfig,
    #[serde(default)]
    pub trader: TraderConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Column names used when reading score tables.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoreColumns {
    #[serde(default = "default_buy_score_column")]
    pub buy_score: String,
    #[serde(default)]
    pub buy_score_2: Option<String>,
    #[serde(default = "default_sell_score_column")]
    pub sell_score: String,
    #[serde(default)]
    pub sell_score_2: Option<String>,
    /// The bar price that trades are simulated at.
    #[serde(default)]
    pub price: PriceColumn,
}

impl Default for ScoreColumns {
    fn default() -> Self {
        Self {
            buy_score: default_buy_score_column(),
            buy_score_2: None,
            sell_score: default_sell_score_column(),
            sell_score_2: None,
            price: PriceColumn::default(),
        }
    }
}

/// The threshold rule used by the live trader.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignalModelConfig {
    #[serde(default)]
    pub rule_type: RuleKind,
    pub buy_signal_threshold: Option<f64>,
    pub buy_signal_threshold_2: Option<f64>,
    pub sell_signal_threshold: Option<f64>,
    pub sell_signal_threshold_2: Option<f64>,
    /// Derive the sell thresholds as the negated buy thresholds.
    #[serde(default)]
    pub buy_sell_equal: bool,
}

/// Parameters for the live scheduler and the spot executor.
#[derive(Debug, Clone, Deserialize)]
pub struct TraderConfig {
    /// How often a cycle is triggered. Ticks are aligned to wall-clock multiples.
    #[serde(default = "default_cadence", with = "humantime_serde")]
    pub cadence: Duration,
    /// Exchange kline interval, e.g. "1m".
    #[serde(default = "default_kline_interval")]
    pub kline_interval: String,
    /// Number of bars backfilled during the cold-start sync.
    #[serde(default = "default_history_bars")]
    pub history_bars: usize,
    /// Maximum tolerated difference between local and exchange clocks.
    #[serde(default = "default_max_clock_skew_ms")]
    pub max_clock_skew_ms: i64,
    #[serde(default = "default_base_asset")]
    pub base_asset: String,
    #[serde(default = "default_quote_asset")]
    pub quote_asset: String,
    /// Fraction of the quote balance spent when opening a position.
    #[serde(default = "default_quote_fraction")]
    pub quote_fraction: Decimal,
    /// Base balances below this are treated as dust, i.e. no position.
    #[serde(default = "default_min_base_quantity")]
    pub min_base_quantity: Decimal,
    /// Decimal places accepted by the exchange for base quantities.
    #[serde(default = "default_quantity_precision")]
    pub quantity_precision: u32,
    #[serde(default)]
    pub allow_short: bool,
    /// Simulate orders against an in-memory account instead of the exchange.
    #[serde(default)]
    pub paper_trading: bool,
    /// Starting quote balance of the paper account.
    #[serde(default = "default_paper_quote_quantity")]
    pub paper_quote_quantity: Decimal,
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for TraderConfig {
    fn default() -> Self {
        Self {
            cadence: default_cadence(),
            kline_interval: default_kline_interval(),
            history_bars: default_history_bars(),
            max_clock_skew_ms: default_max_clock_skew_ms(),
            base_asset: default_base_asset(),
            quote_asset: default_quote_asset(),
            quote_fraction: default_quote_fraction(),
            min_base_quantity: default_min_base_quantity(),
            quantity_precision: default_quantity_precision(),
            allow_short: false,
            paper_trading: false,
            paper_quote_quantity: default_paper_quote_quantity(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Exchange REST credentials. Opaque to the core.
#[derive(Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub secret: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            key: String::new(),
            secret: String::new(),
        }
    }
}

// Keep credentials out of logs.
impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("key", &redact(&self.key))
            .field("secret", &redact(&self.secret))
            .finish()
    }
}

#[derive(Clone, Default, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub chat_id: String,
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &redact(&self.token))
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG` when set.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// When set, logs are also written to a daily-rolling file in this folder.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    #[serde(default = "default_log_file_prefix")]
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: None,
            file_prefix: default_log_file_prefix(),
        }
    }
}

impl Config {
    /// Checks cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbol.trim().is_empty() {
            return Err(ConfigError::ValidationError("`symbol` must not be empty".to_string()));
        }
        if self.time_column.trim().is_empty() {
            return Err(ConfigError::ValidationError("`time_column` must not be empty".to_string()));
        }
        self.signal_model.validate()?;
        self.train_signal_model.validate()?;
        self.trader.validate()?;
        Ok(())
    }

    /// Folder holding the score table and the grid-search artifact.
    pub fn symbol_folder(&self) -> PathBuf {
        self.data_folder.join(&self.symbol)
    }

    /// Full path of the score table (`<data_folder>/<symbol>/<signal_file_name>.csv`).
    pub fn signal_file_path(&self) -> PathBuf {
        self.symbol_folder().join(&self.signal_file_name).with_extension("csv")
    }

    /// Full path of the grid-search artifact (`<data_folder>/<symbol>/<signal_models_file_name>.txt`).
    pub fn signal_models_file_path(&self) -> PathBuf {
        self.symbol_folder().join(&self.signal_models_file_name).with_extension("txt")
    }
}

impl SignalModelConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buy_sell_equal
            && (self.sell_signal_threshold.is_some() || self.sell_signal_threshold_2.is_some())
        {
            return Err(ConfigError::ValidationError(
                "`signal_model.buy_sell_equal` derives the sell thresholds; do not set them explicitly".to_string(),
            ));
        }
        Ok(())
    }
}

impl TraderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cadence < Duration::from_secs(1) {
            return Err(ConfigError::ValidationError(
                "`trader.cadence` must be at least one second".to_string(),
            ));
        }
        if self.quote_fraction <= Decimal::ZERO || self.quote_fraction > Decimal::ONE {
            return Err(ConfigError::ValidationError(format!(
                "`trader.quote_fraction` must be in (0, 1], got {}",
                self.quote_fraction
            )));
        }
        if self.history_bars == 0 {
            return Err(ConfigError::ValidationError(
                "`trader.history_bars` must be positive".to_string(),
            ));
        }
        if self.max_clock_skew_ms < 0 {
            return Err(ConfigError::ValidationError(
                "`trader.max_clock_skew_ms` must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() { "<unset>" } else { "<redacted>" }
}

// --- Default Implementations ---

fn default_time_column() -> String {
    "timestamp".to_string()
}
fn default_signal_file_name() -> String {
    "signals".to_string()
}
fn default_signal_models_file_name() -> String {
    "signal_models".to_string()
}
fn default_buy_score_column() -> String {
    "buy_score_column".to_string()
}
fn default_sell_score_column() -> String {
    "sell_score_column".to_string()
}
fn default_cadence() -> Duration {
    Duration::from_secs(60)
}
fn default_kline_interval() -> String {
    "1m".to_string()
}
fn default_history_bars() -> usize {
    1440
}
fn default_max_clock_skew_ms() -> i64 {
    1000
}
fn default_base_asset() -> String {
    "BTC".to_string()
}
fn default_quote_asset() -> String {
    "USDT".to_string()
}
fn default_quote_fraction() -> Decimal {
    dec!(0.99)
}
fn default_min_base_quantity() -> Decimal {
    dec!(0.0001)
}
fn default_quantity_precision() -> u32 {
    5
}
fn default_paper_quote_quantity() -> Decimal {
    dec!(1000)
}
fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}
fn default_api_base_url() -> String {
    "https://api.binance.com".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_file_prefix() -> String {
    "signaler.log".to_string()
}
