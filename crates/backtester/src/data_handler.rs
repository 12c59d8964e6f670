use crate::error::BacktestError;
use analytics::months_between;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use configuration::Config;
use core_types::{PriceColumn, ScoreSample};
use csv::StringRecord;
use std::path::Path;

/// Column names and row limits used when reading a score table.
#[derive(Debug, Clone)]
pub struct FrameOptions {
    pub time_column: String,
    pub buy_column: String,
    pub buy_2_column: Option<String>,
    pub sell_column: String,
    pub sell_2_column: Option<String>,
    /// When `None`, prices are not read and every sample is unpriced.
    pub price: Option<PriceColumn>,
    /// Maximum number of data rows to read from the file.
    pub nrows: Option<usize>,
    pub start_index: usize,
    pub end_index: Option<usize>,
}

impl FrameOptions {
    /// Options for a grid-search run: prices and row limits included.
    pub fn from_config(config: &Config) -> Self {
        Self {
            price: Some(config.columns.price),
            nrows: config.train_signal_model.nrows,
            start_index: config.train_signal_model.start_index,
            end_index: config.train_signal_model.end_index,
            ..Self::scores_only(config)
        }
    }

    /// Options for reading live scores: whole file, no price column.
    pub fn scores_only(config: &Config) -> Self {
        Self {
            time_column: config.time_column.clone(),
            buy_column: config.columns.buy_score.clone(),
            buy_2_column: config.columns.buy_score_2.clone(),
            sell_column: config.columns.sell_score.clone(),
            sell_2_column: config.columns.sell_score_2.clone(),
            price: None,
            nrows: None,
            start_index: 0,
            end_index: None,
        }
    }
}

/// Score samples with their aligned prices, ordered by strictly increasing timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalFrame {
    samples: Vec<ScoreSample>,
    prices: Vec<Option<f64>>,
}

impl SignalFrame {
    pub fn new(samples: Vec<ScoreSample>, prices: Vec<Option<f64>>) -> Result<Self, BacktestError> {
        if samples.len() != prices.len() {
            return Err(BacktestError::MisalignedSeries {
                samples: samples.len(),
                signals: prices.len(),
            });
        }
        if let Some(pos) = samples
            .windows(2)
            .position(|pair| pair[1].timestamp <= pair[0].timestamp)
        {
            return Err(BacktestError::UnorderedTimestamps { row: pos + 1 });
        }
        Ok(Self { samples, prices })
    }

    pub fn samples(&self) -> &[ScoreSample] {
        &self.samples
    }

    pub fn prices(&self) -> &[Option<f64>] {
        &self.prices
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Span from the first to the last sample in 30.5-day months.
    pub fn months(&self) -> Result<f64, BacktestError> {
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => Ok(months_between(first.timestamp, last.timestamp)?),
            _ => Ok(0.0),
        }
    }

    /// The sample stamped exactly `timestamp`, if any.
    pub fn sample_at(&self, timestamp: DateTime<Utc>) -> Option<&ScoreSample> {
        self.samples
            .binary_search_by(|s| s.timestamp.cmp(&timestamp))
            .ok()
            .map(|idx| &self.samples[idx])
    }
}

struct ColumnIndex {
    time: usize,
    buy: usize,
    buy_2: Option<usize>,
    sell: usize,
    sell_2: Option<usize>,
    price: Option<usize>,
}

impl ColumnIndex {
    fn resolve(headers: &StringRecord, opts: &FrameOptions) -> Result<Self, BacktestError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| BacktestError::MissingColumn(name.to_string()))
        };
        Ok(Self {
            time: find(&opts.time_column)?,
            buy: find(&opts.buy_column)?,
            buy_2: opts.buy_2_column.as_deref().map(find).transpose()?,
            sell: find(&opts.sell_column)?,
            sell_2: opts.sell_2_column.as_deref().map(find).transpose()?,
            price: opts.price.map(|p| find(p.as_str())).transpose()?,
        })
    }
}

/// Loads a score table from a CSV file.
///
/// At most `nrows` data rows are read; the result is then sliced to
/// `start_index..end_index`. An empty result is reported as `DataUnavailable`.
pub fn load_signal_frame(path: &Path, opts: &FrameOptions) -> Result<SignalFrame, BacktestError> {
    if !path.exists() {
        return Err(BacktestError::DataUnavailable(format!(
            "{} does not exist",
            path.display()
        )));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(b',')
        .trim(csv::Trim::All)
        .from_path(path)?;
    let columns = ColumnIndex::resolve(reader.headers()?, opts)?;

    let limit = opts.nrows.unwrap_or(usize::MAX);
    let mut samples = Vec::new();
    let mut prices = Vec::new();
    for (row, record) in reader.records().take(limit).enumerate() {
        let record = record?;
        let raw_time = record.get(columns.time).unwrap_or_default();
        let timestamp = parse_timestamp(raw_time).ok_or_else(|| BacktestError::Parse {
            row,
            column: opts.time_column.clone(),
            value: raw_time.to_string(),
        })?;

        let score = |idx: usize, name: &str| parse_cell(&record, idx, row, name);
        samples.push(ScoreSample {
            timestamp,
            buy_score: score(columns.buy, &opts.buy_column)?,
            buy_score_2: match columns.buy_2 {
                Some(idx) => score(idx, opts.buy_2_column.as_deref().unwrap_or_default())?,
                None => None,
            },
            sell_score: score(columns.sell, &opts.sell_column)?,
            sell_score_2: match columns.sell_2 {
                Some(idx) => score(idx, opts.sell_2_column.as_deref().unwrap_or_default())?,
                None => None,
            },
        });
        prices.push(match (columns.price, opts.price) {
            (Some(idx), Some(column)) => score(idx, column.as_str())?,
            _ => None,
        });
    }

    let end = opts.end_index.unwrap_or(samples.len()).min(samples.len());
    let start = opts.start_index.min(end);
    samples.truncate(end);
    prices.truncate(end);
    samples.drain(..start);
    prices.drain(..start);

    if samples.is_empty() {
        return Err(BacktestError::DataUnavailable(format!(
            "no rows left in {} after applying row limits",
            path.display()
        )));
    }

    tracing::debug!(path = %path.display(), rows = samples.len(), "Loaded score table");
    SignalFrame::new(samples, prices)
}

/// Empty cells are missing values; anything else must parse as a float (NaN included).
fn parse_cell(
    record: &StringRecord,
    idx: usize,
    row: usize,
    column: &str,
) -> Result<Option<f64>, BacktestError> {
    let raw = record.get(idx).unwrap_or_default();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<f64>().map(Some).map_err(|_| BacktestError::Parse {
        row,
        column: column.to_string(),
        value: raw.to_string(),
    })
}

/// Parses the timestamp formats found in score tables.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS[.f]` (with or without `T` and offset),
/// a bare date, or integer epoch milliseconds. Naive values are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    raw.parse::<i64>()
        .ok()
        .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
}
