use crate::error::EngineError;
use async_trait::async_trait;
use backtester::{FrameOptions, load_signal_frame};
use chrono::{DateTime, Utc};
use core_types::ScoreSample;
use std::path::PathBuf;

/// Supplies the model scores for a bar.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScoreSource: Send + Sync {
    /// Returns the sample stamped with `timestamp`, or `DataUnavailable` when
    /// the predictor has not produced it yet.
    async fn score_at(&self, timestamp: DateTime<Utc>) -> Result<ScoreSample, EngineError>;
}

/// Reads scores from the predictor's CSV output.
///
/// The file is re-read on every lookup because the predictor appends to it
/// between cycles.
pub struct CsvScoreSource {
    path: PathBuf,
    options: FrameOptions,
}

impl CsvScoreSource {
    pub fn new(path: PathBuf, options: FrameOptions) -> Self {
        Self { path, options }
    }
}

#[async_trait]
impl ScoreSource for CsvScoreSource {
    async fn score_at(&self, timestamp: DateTime<Utc>) -> Result<ScoreSample, EngineError> {
        let path = self.path.clone();
        let options = self.options.clone();
        let frame = tokio::task::spawn_blocking(move || load_signal_frame(&path, &options)).await??;

        frame.sample_at(timestamp).copied().ok_or_else(|| {
            EngineError::DataUnavailable(format!(
                "no score for {} in {}",
                timestamp,
                self.path.display()
            ))
        })
    }
}
