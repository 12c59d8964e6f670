use indicatif::style::TemplateError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OptimizerError {
    #[error("Configuration error: {0}")]
    Config(#[from] configuration::error::ConfigError),

    #[error("Backtest execution failed within optimizer: {0}")]
    Backtest(#[from] backtester::error::BacktestError),

    #[error("Strategy error during parameter generation: {0}")]
    Strategy(#[from] strategies::StrategyError),

    #[error("Parameter generation failed: {0}")]
    ParameterGeneration(String),

    #[error("Failed to write results: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode results: {0}")]
    Csv(#[from] csv::Error),

    #[error("Progress bar template error: {0}")]
    ProgressBarTemplate(String),
}

impl From<TemplateError> for OptimizerError {
    fn from(error: TemplateError) -> Self {
        OptimizerError::ProgressBarTemplate(error.to_string())
    }
}
