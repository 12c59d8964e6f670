use crate::error::AnalyticsError;
use crate::report::{PerformanceRecord, PerformanceReport};
use chrono::{DateTime, Utc};
use core_types::{Direction, Trade};

/// Length of the month used for all per-month normalization.
pub const DAYS_PER_MONTH: f64 = 30.5;

const SECONDS_PER_MONTH: f64 = DAYS_PER_MONTH * 24.0 * 60.0 * 60.0;

/// Span between two timestamps, in months of [`DAYS_PER_MONTH`] days.
pub fn months_between(first: DateTime<Utc>, last: DateTime<Utc>) -> Result<f64, AnalyticsError> {
    if last < first {
        return Err(AnalyticsError::NegativeSpan {
            first: first.to_rfc3339(),
            last: last.to_rfc3339(),
        });
    }
    let span = last - first;
    Ok(span.num_milliseconds() as f64 / 1000.0 / SECONDS_PER_MONTH)
}

/// A stateless calculator for deriving performance metrics from trading activity.
#[derive(Debug, Default)]
pub struct AnalyticsEngine {}

impl AnalyticsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calculates the overall, long-only and short-only metrics.
    ///
    /// `months` is the span of the simulated series, normally from [`months_between`].
    pub fn calculate(&self, trades: &[Trade], months: f64) -> PerformanceReport {
        PerformanceReport {
            overall: self.record(trades.iter(), months),
            long: self.record(trades.iter().filter(|t| t.direction == Direction::Long), months),
            short: self.record(trades.iter().filter(|t| t.direction == Direction::Short), months),
            months,
        }
    }

    fn record<'a>(&self, trades: impl Iterator<Item = &'a Trade>, months: f64) -> PerformanceRecord {
        let mut profit_total_pct = 0.0;
        let mut transaction_count = 0usize;
        let mut profitable = 0usize;

        for trade in trades {
            profit_total_pct += trade.profit_pct;
            if trade.forced {
                continue;
            }
            transaction_count += 1;
            if trade.profit_pct > 0.0 {
                profitable += 1;
            }
        }

        PerformanceRecord {
            profit_total_pct,
            transaction_count,
            profitable_fraction: ratio(profitable as f64, transaction_count as f64),
            profit_pct_per_month: ratio(profit_total_pct, months),
            profit_pct_per_transaction: ratio(profit_total_pct, transaction_count as f64),
            transactions_per_month: ratio(transaction_count as f64, months),
        }
    }
}

/// Division where an empty or zero denominator yields 0.0.
fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 && denominator.is_finite() {
        numerator / denominator
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn trade(direction: Direction, open: f64, close: f64, forced: bool) -> Trade {
        Trade::new(direction, t(0), open, t(1), close, forced)
    }

    #[test]
    fn months_use_thirty_and_a_half_days() {
        let first = t(0);
        let last = first + Duration::days(61);
        assert!((months_between(first, last).unwrap() - 2.0).abs() < 1e-12);
        assert_eq!(months_between(first, first).unwrap(), 0.0);
        assert!(months_between(last, first).is_err());
    }

    #[test]
    fn no_trades_yields_zeroes_without_dividing() {
        let report = AnalyticsEngine::new().calculate(&[], 0.0);
        assert_eq!(report.overall, PerformanceRecord::default());
        assert_eq!(report.overall.profit_pct_per_transaction, 0.0);
    }

    #[test]
    fn forced_close_counts_toward_profit_but_not_transactions() {
        let trades = vec![
            trade(Direction::Long, 100.0, 110.0, false),
            trade(Direction::Short, 100.0, 105.0, false),
            trade(Direction::Long, 100.0, 102.0, true),
        ];
        let report = AnalyticsEngine::new().calculate(&trades, 2.0);

        assert!((report.overall.profit_total_pct - 7.0).abs() < 1e-9);
        assert_eq!(report.overall.transaction_count, 2);
        assert!((report.overall.profitable_fraction - 0.5).abs() < 1e-12);
        assert!((report.overall.profit_pct_per_month - 3.5).abs() < 1e-9);
        assert!((report.overall.profit_pct_per_transaction - 3.5).abs() < 1e-9);
        assert!((report.overall.transactions_per_month - 1.0).abs() < 1e-12);

        assert_eq!(report.long.transaction_count, 1);
        assert!((report.long.profit_total_pct - 12.0).abs() < 1e-9);
        assert_eq!(report.short.transaction_count, 1);
        assert!((report.short.profit_total_pct - -5.0).abs() < 1e-9);
        assert_eq!(report.short.profitable_fraction, 0.0);
    }

    #[test]
    fn zero_span_keeps_totals_but_zeroes_monthly_rates() {
        let trades = vec![trade(Direction::Long, 100.0, 101.0, false)];
        let report = AnalyticsEngine::new().calculate(&trades, 0.0);
        assert!((report.overall.profit_total_pct - 1.0).abs() < 1e-9);
        assert_eq!(report.overall.profit_pct_per_month, 0.0);
        assert_eq!(report.overall.transactions_per_month, 0.0);
    }
}
