use serde::{Deserialize, Serialize};

/// Aggregated metrics for one set of trades.
///
/// All percentages are in percent. Trades closed only because the series ended
/// contribute to `profit_total_pct` (and the values derived from it) but are not
/// counted as transactions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    /// Additive sum of the percent returns of all trades.
    pub profit_total_pct: f64,
    pub transaction_count: usize,
    /// Fraction (0..=1) of counted trades with a positive return.
    pub profitable_fraction: f64,
    pub profit_pct_per_month: f64,
    pub profit_pct_per_transaction: f64,
    pub transactions_per_month: f64,
}

/// The standardized performance summary of one simulation.
///
/// This is the data transfer object for results between the simulator, the
/// optimizer and the artifact writer. It never carries the trade list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub overall: PerformanceRecord,
    pub long: PerformanceRecord,
    pub short: PerformanceRecord,
    /// Length of the simulated period in 30.5-day months.
    pub months: f64,
}
