use crate::error::OptimizerError;
use crate::generator::generate_rules;
use analytics::PerformanceReport;
use backtester::{SignalFrame, TradeSimulator};
use configuration::TrainSignalModelConfig;
use core_types::RuleKind;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use strategies::ThresholdRule;

pub mod artifact;
pub mod error;
pub mod generator;

pub use artifact::append_results;

/// One evaluated grid point: the rule and its performance summary.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedPoint {
    pub rule: ThresholdRule,
    pub report: PerformanceReport,
}

/// Exhaustive grid search over threshold rules.
pub struct ParameterSearchEngine {
    config: TrainSignalModelConfig,
    default_kind: RuleKind,
    show_progress: bool,
    simulator: TradeSimulator,
}

impl ParameterSearchEngine {
    /// `default_kind` is used when the grid does not list rule kinds.
    pub fn new(config: TrainSignalModelConfig, default_kind: RuleKind) -> Self {
        Self {
            config,
            default_kind,
            show_progress: true,
            simulator: TradeSimulator::new(),
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Backtests every grid point over `frame` and returns the best `top_n`.
    ///
    /// Points run in parallel on the rayon pool. The result is ordered by
    /// `profit_pct_per_month`, best first; equal values keep grid order.
    pub fn run(&self, frame: &SignalFrame) -> Result<Vec<RankedPoint>, OptimizerError> {
        let rules = generate_rules(&self.config, self.default_kind)?;
        if rules.is_empty() {
            tracing::warn!("Parameter grid is empty. Nothing to evaluate.");
            return Ok(Vec::new());
        }

        tracing::info!(
            points = rules.len(),
            samples = frame.len(),
            threads = rayon::current_num_threads(),
            "Starting grid search"
        );

        let progress_bar = if self.show_progress {
            ProgressBar::new(rules.len() as u64)
        } else {
            ProgressBar::hidden()
        };
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
                .progress_chars("=>-"),
        );

        let evaluated = rules
            .par_iter()
            .map(|rule| -> Result<RankedPoint, OptimizerError> {
                let outcome = self.simulator.backtest(frame, rule)?;
                progress_bar.inc(1);
                Ok(RankedPoint { rule: *rule, report: outcome.report })
            })
            .collect::<Result<Vec<_>, _>>()?;

        progress_bar.finish_with_message("Grid search complete.");

        Ok(rank_top_n(evaluated, self.config.top_n))
    }
}

/// Stable descending sort by monthly profit, truncated to `n`.
pub fn rank_top_n(mut points: Vec<RankedPoint>, n: usize) -> Vec<RankedPoint> {
    points.sort_by(|a, b| {
        b.report
            .overall
            .profit_pct_per_month
            .total_cmp(&a.report.overall.profit_pct_per_month)
    });
    points.truncate(n);
    points
}
