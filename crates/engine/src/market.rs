use crate::error::EngineError;
use api_client::{ApiClient, MAX_KLINES_PER_REQUEST};
use chrono::{DateTime, Duration, Utc};
use core_types::Kline;
use std::collections::VecDeque;

/// Parses an exchange kline interval such as `1m`, `4h` or `1d`.
pub fn parse_interval(interval: &str) -> Result<Duration, EngineError> {
    let invalid =
        || EngineError::Configuration(format!("Unsupported kline interval '{}'", interval));

    let split = interval.find(|c: char| !c.is_ascii_digit()).ok_or_else(invalid)?;
    let (count, unit) = interval.split_at(split);
    let count: i64 = count.parse().map_err(|_| invalid())?;
    if count <= 0 {
        return Err(invalid());
    }
    match unit {
        "s" => Ok(Duration::seconds(count)),
        "m" => Ok(Duration::minutes(count)),
        "h" => Ok(Duration::hours(count)),
        "d" => Ok(Duration::days(count)),
        "w" => Ok(Duration::weeks(count)),
        _ => Err(invalid()),
    }
}

/// A bounded, time-ordered window of the most recent bars.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BarBuffer {
    bars: VecDeque<Kline>,
    capacity: usize,
}

impl BarBuffer {
    pub fn new(capacity: usize) -> Self {
        Self { bars: VecDeque::with_capacity(capacity), capacity }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&Kline> {
        self.bars.back()
    }

    /// Merges freshly fetched bars into the window.
    ///
    /// A bar with the same open time as the newest buffered bar replaces it,
    /// since that bar may have still been forming when it was fetched. Older
    /// bars are ignored. The oldest bars are dropped once over capacity.
    pub fn merge(&mut self, bars: impl IntoIterator<Item = Kline>) -> usize {
        let mut added = 0;
        for bar in bars {
            match self.bars.back().map(|last| last.open_time) {
                Some(last) if bar.open_time < last => continue,
                Some(last) if bar.open_time == last => {
                    if let Some(slot) = self.bars.back_mut() {
                        *slot = bar;
                    }
                }
                _ => {
                    self.bars.push_back(bar);
                    added += 1;
                }
            }
        }
        while self.bars.len() > self.capacity {
            self.bars.pop_front();
        }
        added
    }

    /// The newest bar whose close time has passed.
    pub fn latest_closed(&self, now: DateTime<Utc>) -> Option<&Kline> {
        self.bars.iter().rev().find(|bar| bar.is_closed_at(now))
    }
}

/// Fetches every bar from `start` up to `now`, paging through the exchange limit.
async fn fetch_range(
    api_client: &dyn ApiClient,
    symbol: &str,
    interval: &str,
    start: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<Vec<Kline>, EngineError> {
    let step = parse_interval(interval)?;
    let mut cursor = start;
    let mut bars = Vec::new();

    while cursor <= now {
        let batch = api_client
            .fetch_klines(symbol, interval, Some(cursor), MAX_KLINES_PER_REQUEST)
            .await?;
        let Some(last) = batch.last() else { break };
        let next = last.open_time + step;
        let full_page = batch.len() >= usize::from(MAX_KLINES_PER_REQUEST);
        bars.extend(batch);
        if !full_page || next <= cursor {
            break;
        }
        cursor = next;
    }

    Ok(bars)
}

/// Backfills `capacity` bars ending at `now` into a new buffer.
pub async fn cold_start_sync(
    api_client: &dyn ApiClient,
    symbol: &str,
    interval: &str,
    capacity: usize,
    now: DateTime<Utc>,
) -> Result<BarBuffer, EngineError> {
    let step = parse_interval(interval)?;
    let bars_back = i32::try_from(capacity).map_err(|_| {
        EngineError::Configuration(format!("history window of {} bars is too large", capacity))
    })?;
    let start = now - step * bars_back;

    let mut buffer = BarBuffer::new(capacity);
    let fetched = fetch_range(api_client, symbol, interval, start, now).await?;
    buffer.merge(fetched);

    if buffer.is_empty() {
        return Err(EngineError::DataUnavailable(format!(
            "no {} klines returned for {}",
            interval, symbol
        )));
    }
    tracing::info!(symbol, bars = buffer.len(), "Cold-start sync complete");
    Ok(buffer)
}

/// Fetches the bars added since the newest buffered bar, refreshing that bar too.
pub async fn incremental_sync(
    api_client: &dyn ApiClient,
    buffer: &mut BarBuffer,
    symbol: &str,
    interval: &str,
    now: DateTime<Utc>,
) -> Result<usize, EngineError> {
    let Some(start) = buffer.last().map(|bar| bar.open_time) else {
        *buffer = cold_start_sync(api_client, symbol, interval, buffer.capacity, now).await?;
        return Ok(buffer.len());
    };
    let fetched = fetch_range(api_client, symbol, interval, start, now).await?;
    let added = buffer.merge(fetched);
    tracing::debug!(symbol, added, "Incremental sync complete");
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockApi, bar, t0};

    #[test]
    fn intervals_parse_to_durations() {
        assert_eq!(parse_interval("1m").unwrap(), Duration::minutes(1));
        assert_eq!(parse_interval("15m").unwrap(), Duration::minutes(15));
        assert_eq!(parse_interval("4h").unwrap(), Duration::hours(4));
        assert_eq!(parse_interval("1w").unwrap(), Duration::weeks(1));
        assert!(parse_interval("0m").is_err());
        assert!(parse_interval("m").is_err());
        assert!(parse_interval("1M").is_err());
    }

    #[test]
    fn merge_replaces_the_forming_bar_and_caps_the_window() {
        let mut buffer = BarBuffer::new(3);
        buffer.merge((0..3).map(|i| bar(i, 100.0)));
        assert_eq!(buffer.len(), 3);

        let added = buffer.merge(vec![bar(1, 1.0), bar(2, 105.0), bar(3, 106.0)]);

        assert_eq!(added, 1);
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.bars[0].open_time, bar(1, 0.0).open_time);
        assert_eq!(buffer.bars[1].close, bar(2, 105.0).close);
    }

    #[test]
    fn latest_closed_skips_the_forming_bar() {
        let mut buffer = BarBuffer::new(10);
        buffer.merge((0..3).map(|i| bar(i, 100.0 + i as f64)));
        let now = t0() + Duration::minutes(2) + Duration::seconds(30);

        let latest = buffer.latest_closed(now).unwrap();

        assert_eq!(latest.open_time, t0() + Duration::minutes(1));
    }

    #[tokio::test]
    async fn cold_start_pages_through_the_request_limit() {
        let mut api = MockApi::new();
        let mut seq = mockall::Sequence::new();
        api.expect_fetch_klines()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _, limit| Ok((0..i64::from(limit)).map(|i| bar(i, 100.0)).collect()));
        api.expect_fetch_klines()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|_, _, start, _| *start == Some(t0() + Duration::minutes(1000)))
            .returning(|_, _, _, _| Ok((1000..1200).map(|i| bar(i, 100.0)).collect()));

        let now = t0() + Duration::minutes(1200);
        let buffer = cold_start_sync(&api, "BTCUSDT", "1m", 1440, now).await.unwrap();

        assert_eq!(buffer.len(), 1200);
    }

    #[tokio::test]
    async fn cold_start_without_data_fails() {
        let mut api = MockApi::new();
        api.expect_fetch_klines().returning(|_, _, _, _| Ok(vec![]));

        let result = cold_start_sync(&api, "BTCUSDT", "1m", 10, t0()).await;

        assert!(matches!(result, Err(EngineError::DataUnavailable(_))));
    }

    #[tokio::test]
    async fn incremental_sync_starts_at_the_newest_bar() {
        let mut api = MockApi::new();
        api.expect_fetch_klines()
            .withf(|symbol, _, start, _| {
                symbol == "BTCUSDT" && *start == Some(t0() + Duration::minutes(4))
            })
            .times(1)
            .returning(|_, _, _, _| Ok(vec![bar(4, 104.5), bar(5, 105.0)]));

        let mut buffer = BarBuffer::new(10);
        buffer.merge((0..5).map(|i| bar(i, 100.0 + i as f64)));

        let now = t0() + Duration::minutes(6);
        let added = incremental_sync(&api, &mut buffer, "BTCUSDT", "1m", now).await.unwrap();

        assert_eq!(added, 1);
        assert_eq!(buffer.len(), 6);
    }
}
