use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StrategyError {
    #[error("Signal rule received invalid parameters: {0}")]
    InvalidParameters(String),
}
