use thiserror::Error;

#[derive(Error, Debug)]
pub enum BacktestError {
    #[error("Signal series has {signals} entries but the frame has {samples} samples")]
    MisalignedSeries { samples: usize, signals: usize },

    #[error("Score data is missing or empty: {0}")]
    DataUnavailable(String),

    #[error("Failed to read score table: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed score table: {0}")]
    Csv(#[from] csv::Error),

    #[error("Row {row}: cannot parse column '{column}' value '{value}'")]
    Parse {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Column '{0}' not found in the score table header")]
    MissingColumn(String),

    #[error("Timestamps must be strictly increasing (row {row})")]
    UnorderedTimestamps { row: usize },

    #[error("Analytics calculation error: {0}")]
    Analytics(#[from] analytics::AnalyticsError),
}
