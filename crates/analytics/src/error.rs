use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyticsError {
    #[error("Simulation span is negative: last timestamp {last} precedes first timestamp {first}")]
    NegativeSpan { first: String, last: String },
}
