use crate::RankedPoint;
use crate::error::OptimizerError;
use std::fs::{self, OpenOptions};
use std::path::Path;

/// Column order of the signal-models artifact.
pub const HEADER: [&str; 13] = [
    "buy_signal_threshold",
    "buy_signal_threshold_2",
    "sell_signal_threshold",
    "sell_signal_threshold_2",
    "rule_type",
    "profit_percent_per_month",
    "profitable",
    "profit_percent_per_transaction",
    "transaction_no_per_month",
    "long_profit_percent_per_month",
    "long_profitable",
    "short_profit_percent_per_month",
    "short_profitable",
];

/// Appends ranked points to the artifact at `path` and returns the number of rows written.
///
/// The header is written only when the file is missing or empty, so repeated
/// runs accumulate rows under a single header. Nothing is touched when `points`
/// is empty.
pub fn append_results(path: &Path, points: &[RankedPoint]) -> Result<usize, OptimizerError> {
    if points.is_empty() {
        return Ok(0);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let needs_header = fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);

    if needs_header {
        writer.write_record(HEADER)?;
    }
    for point in points {
        writer.write_record(row(point))?;
    }
    writer.flush()?;

    tracing::info!(path = %path.display(), rows = points.len(), "Appended grid-search results");
    Ok(points.len())
}

fn row(point: &RankedPoint) -> Vec<String> {
    let rule = &point.rule;
    let report = &point.report;
    vec![
        fixed(rule.buy_threshold()),
        optional(rule.buy_threshold_2()),
        fixed(rule.sell_threshold()),
        optional(rule.sell_threshold_2()),
        rule.kind().as_str().to_string(),
        fixed(report.overall.profit_pct_per_month),
        fixed(report.overall.profitable_fraction),
        fixed(report.overall.profit_pct_per_transaction),
        fixed(report.overall.transactions_per_month),
        fixed(report.long.profit_pct_per_month),
        fixed(report.long.profitable_fraction),
        fixed(report.short.profit_pct_per_month),
        fixed(report.short.profitable_fraction),
    ]
}

/// Three decimals; negative zero is written as `0.000`.
fn fixed(value: f64) -> String {
    let rounded = format!("{:.3}", value);
    match rounded.strip_prefix('-') {
        Some(abs) if abs.chars().all(|c| c == '0' || c == '.') => abs.to_string(),
        _ => rounded,
    }
}

fn optional(value: Option<f64>) -> String {
    value.map(fixed).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use analytics::PerformanceReport;
    use core_types::RuleKind;
    use strategies::ThresholdRule;

    fn point(buy: f64, sell: f64, per_month: f64) -> RankedPoint {
        let mut report = PerformanceReport::default();
        report.overall.profit_pct_per_month = per_month;
        report.overall.profitable_fraction = 2.0 / 3.0;
        RankedPoint {
            rule: ThresholdRule::new(RuleKind::OneDimensional, buy, None, sell, None).unwrap(),
            report,
        }
    }

    #[test]
    fn header_is_written_once_across_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("BTCUSDT").join("signal_models.txt");

        append_results(&path, &[point(0.1, -0.1, 1.23456)]).unwrap();
        append_results(&path, &[point(0.2, -0.2, 0.5), point(0.3, -0.3, 0.25)]).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], HEADER.join(","));
        assert_eq!(lines.iter().filter(|l| l.starts_with("buy_signal_threshold")).count(), 1);
        assert_eq!(
            lines[1],
            "0.100,,-0.100,,one_dim_rule,1.235,0.667,0.000,0.000,0.000,0.000,0.000,0.000"
        );
    }

    #[test]
    fn empty_results_leave_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signal_models.txt");
        assert_eq!(append_results(&path, &[]).unwrap(), 0);
        assert!(!path.exists());
    }

    #[test]
    fn header_is_added_to_an_existing_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        append_results(file.path(), &[point(0.1, -0.1, 1.0)]).unwrap();
        let contents = fs::read_to_string(file.path()).unwrap();
        assert!(contents.starts_with("buy_signal_threshold,"));
    }

    #[test]
    fn negative_zero_is_normalized() {
        assert_eq!(fixed(-0.0), "0.000");
        assert_eq!(fixed(-0.0004), "0.000");
        assert_eq!(fixed(-0.0006), "-0.001");
        assert_eq!(fixed(2.0), "2.000");
    }
}
