use crate::SignalModel;
use crate::error::StrategyError;
use core_types::{RuleKind, ScoreSample, Signal};
use serde::Serialize;

/// A score threshold rule.
///
/// - One-dimensional: buy when `buy_score >= buy_threshold`, sell when
///   `sell_score <= sell_threshold`. A configured secondary threshold narrows the
///   decision with an AND on the matching secondary column.
/// - Two-dimensional: both dimensions are read from the buy columns. Buy when
///   `buy_score >= bt && buy_score_2 >= bt2`, sell when
///   `buy_score <= st && buy_score_2 <= st2`.
///
/// A missing or NaN score never satisfies a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThresholdRule {
    kind: RuleKind,
    buy_threshold: f64,
    buy_threshold_2: Option<f64>,
    sell_threshold: f64,
    sell_threshold_2: Option<f64>,
    symmetric: bool,
}

impl ThresholdRule {
    pub fn new(
        kind: RuleKind,
        buy_threshold: f64,
        buy_threshold_2: Option<f64>,
        sell_threshold: f64,
        sell_threshold_2: Option<f64>,
    ) -> Result<Self, StrategyError> {
        let rule = Self {
            kind,
            buy_threshold,
            buy_threshold_2,
            sell_threshold,
            sell_threshold_2,
            symmetric: false,
        };
        rule.validate()?;
        Ok(rule)
    }

    /// Builds a rule whose sell thresholds are the negated buy thresholds.
    pub fn symmetric(
        kind: RuleKind,
        buy_threshold: f64,
        buy_threshold_2: Option<f64>,
    ) -> Result<Self, StrategyError> {
        let rule = Self {
            kind,
            buy_threshold,
            buy_threshold_2,
            sell_threshold: -buy_threshold,
            sell_threshold_2: buy_threshold_2.map(|t| -t),
            symmetric: true,
        };
        rule.validate()?;
        Ok(rule)
    }

    fn validate(&self) -> Result<(), StrategyError> {
        let all = [
            Some(self.buy_threshold),
            self.buy_threshold_2,
            Some(self.sell_threshold),
            self.sell_threshold_2,
        ];
        if all.iter().flatten().any(|t| !t.is_finite()) {
            return Err(StrategyError::InvalidParameters(format!(
                "thresholds must be finite numbers: {:?}",
                self
            )));
        }
        if self.kind == RuleKind::TwoDimensional
            && (self.buy_threshold_2.is_none() || self.sell_threshold_2.is_none())
        {
            return Err(StrategyError::InvalidParameters(
                "two_dim_rule requires both buy_signal_threshold_2 and sell_signal_threshold_2"
                    .to_string(),
            ));
        }
        Ok(())
    }

    pub fn kind(&self) -> RuleKind {
        self.kind
    }
    pub fn buy_threshold(&self) -> f64 {
        self.buy_threshold
    }
    pub fn buy_threshold_2(&self) -> Option<f64> {
        self.buy_threshold_2
    }
    pub fn sell_threshold(&self) -> f64 {
        self.sell_threshold
    }
    pub fn sell_threshold_2(&self) -> Option<f64> {
        self.sell_threshold_2
    }
    pub fn is_symmetric(&self) -> bool {
        self.symmetric
    }
}

fn at_least(score: Option<f64>, threshold: f64) -> bool {
    matches!(score, Some(s) if s >= threshold)
}

fn at_most(score: Option<f64>, threshold: f64) -> bool {
    matches!(score, Some(s) if s <= threshold)
}

/// An unset secondary threshold does not constrain the decision.
fn narrowed(
    score: Option<f64>,
    threshold: Option<f64>,
    cmp: fn(Option<f64>, f64) -> bool,
) -> bool {
    threshold.is_none_or(|t| cmp(score, t))
}

impl SignalModel for ThresholdRule {
    fn evaluate(&self, sample: &ScoreSample) -> Signal {
        match self.kind {
            RuleKind::OneDimensional => Signal::new(
                at_least(sample.buy_score, self.buy_threshold)
                    && narrowed(sample.buy_score_2, self.buy_threshold_2, at_least),
                at_most(sample.sell_score, self.sell_threshold)
                    && narrowed(sample.sell_score_2, self.sell_threshold_2, at_most),
            ),
            // Validation guarantees both secondary thresholds are set here.
            RuleKind::TwoDimensional => Signal::new(
                at_least(sample.buy_score, self.buy_threshold)
                    && narrowed(sample.buy_score_2, self.buy_threshold_2, at_least),
                at_most(sample.buy_score, self.sell_threshold)
                    && narrowed(sample.buy_score_2, self.sell_threshold_2, at_most),
            ),
        }
    }
}
