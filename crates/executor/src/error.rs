use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Exchange request failed: {0}")]
    Api(#[from] api_client::error::ApiError),

    #[error("Not enough balance to execute trade: {0}")]
    InsufficientFunds(String),

    #[error("Unsupported on this account: {0}")]
    Unsupported(String),

    #[error("Invalid execution price: {0}")]
    InvalidPrice(String),
}
