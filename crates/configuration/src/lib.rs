use crate::error::ConfigError;
use std::path::Path;

pub mod error;
pub mod grid_config;
pub mod logging;
pub mod settings;

pub use grid_config::{GridSpec, OneOrMany, ParameterRange, TrainSignalModelConfig};
pub use logging::init_tracing;
pub use settings::{
    ApiConfig, Config, LoggingConfig, ScoreColumns, SignalModelConfig, TelegramConfig,
    TraderConfig,
};

/// Prefix for environment overrides, e.g. `SIGNALER__API__KEY` sets `api.key`.
pub const ENV_PREFIX: &str = "SIGNALER";

/// Loads and validates the application configuration.
///
/// Values from the TOML file at `path` are overlaid with `SIGNALER__*` environment
/// variables, which is how exchange and Telegram secrets are usually supplied.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path.as_ref()))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    let config = builder.try_deserialize::<Config>()?;
    config.validate()?;
    Ok(config)
}

/// Same as [`load_config`] but reads TOML from a string and ignores the environment.
pub fn load_config_from_str(toml: &str) -> Result<Config, ConfigError> {
    let config = config::Config::builder()
        .add_source(config::File::from_str(toml, config::FileFormat::Toml))
        .build()?
        .try_deserialize::<Config>()?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::{PriceColumn, RuleKind};
    use rust_decimal_macros::dec;
    use std::time::Duration;

    const MINIMAL: &str = r#"
        symbol = "BTCUSDT"
        data_folder = "data"
    "#;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = load_config_from_str(MINIMAL).unwrap();
        assert_eq!(config.time_column, "timestamp");
        assert_eq!(config.columns.price, PriceColumn::Close);
        assert_eq!(config.trader.cadence, Duration::from_secs(60));
        assert_eq!(config.trader.quote_fraction, dec!(0.99));
        assert!(!config.trader.allow_short);
        assert_eq!(config.train_signal_model.top_n, 10);
        assert_eq!(
            config.signal_file_path(),
            Path::new("data").join("BTCUSDT").join("signals.csv")
        );
        assert_eq!(
            config.signal_models_file_path(),
            Path::new("data").join("BTCUSDT").join("signal_models.txt")
        );
    }

    #[test]
    fn full_config_parses_every_grid_form() {
        let toml = r#"
            symbol = "ETHUSDT"
            data_folder = "/tmp/data"

            [columns]
            buy_score = "buy"
            buy_score_2 = "buy2"
            sell_score = "sell"
            price = "open"

            [signal_model]
            rule_type = "two_dim_rule"
            buy_signal_threshold = 0.2
            buy_signal_threshold_2 = 0.1
            sell_signal_threshold = -0.2
            sell_signal_threshold_2 = -0.1

            [trader]
            cadence = "5m"
            allow_short = true

            [train_signal_model]
            top_n = 3
            nrows = 5000

            [train_signal_model.grid]
            rule_type = ["one_dim_rule", "two_dim_rule"]
            buy_signal_threshold = "0.1:0.3:0.1"
            buy_signal_threshold_2 = [0.05, 0.1]
            sell_signal_threshold = { start = -0.3, end = -0.1, step = 0.1 }
            sell_signal_threshold_2 = -0.05
        "#;
        let config = load_config_from_str(toml).unwrap();

        assert_eq!(config.signal_model.rule_type, RuleKind::TwoDimensional);
        assert_eq!(config.columns.price, PriceColumn::Open);
        assert_eq!(config.trader.cadence, Duration::from_secs(300));

        let grid = &config.train_signal_model.grid;
        assert_eq!(
            grid.rule_type.as_ref().unwrap().to_vec(),
            vec![RuleKind::OneDimensional, RuleKind::TwoDimensional]
        );
        assert_eq!(grid.buy_signal_threshold.as_ref().unwrap().expand("b").unwrap().len(), 3);
        assert_eq!(grid.buy_signal_threshold_2.as_ref().unwrap().expand("b2").unwrap(), vec![0.05, 0.1]);
        assert_eq!(grid.sell_signal_threshold.as_ref().unwrap().expand("s").unwrap().len(), 3);
        assert_eq!(grid.sell_signal_threshold_2.as_ref().unwrap().expand("s2").unwrap(), vec![-0.05]);
    }

    #[test]
    fn malformed_grid_fails_at_load_time() {
        let toml = format!(
            "{MINIMAL}\n[train_signal_model.grid]\nbuy_signal_threshold = \"0.1:0.3\"\n"
        );
        assert!(matches!(
            load_config_from_str(&toml),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn out_of_range_quote_fraction_is_rejected() {
        let toml = format!("{MINIMAL}\n[trader]\nquote_fraction = 1.5\n");
        assert!(load_config_from_str(&toml).is_err());
    }

    #[test]
    fn load_config_reads_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, MINIMAL).unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.symbol, "BTCUSDT");
    }
}
