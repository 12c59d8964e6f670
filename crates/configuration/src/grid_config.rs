use crate::error::ConfigError;
use core_types::RuleKind;
use serde::Deserialize;

/// Upper bound on the number of values a single range may expand to.
pub const MAX_RANGE_VALUES: usize = 100_000;

/// Defines a grid-search job. Deserialized from the `[train_signal_model]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TrainSignalModelConfig {
    /// Derive the sell thresholds from the buy thresholds instead of searching them.
    #[serde(default)]
    pub buy_sell_equal: bool,
    /// How many of the best parameter sets to store.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    /// Maximum number of input rows to read.
    #[serde(default)]
    pub nrows: Option<usize>,
    /// First row (after reading) that takes part in the simulation.
    #[serde(default)]
    pub start_index: usize,
    /// Row after the last one that takes part in the simulation.
    #[serde(default)]
    pub end_index: Option<usize>,
    #[serde(default)]
    pub grid: GridSpec,
}

impl Default for TrainSignalModelConfig {
    fn default() -> Self {
        Self {
            buy_sell_equal: false,
            top_n: default_top_n(),
            nrows: None,
            start_index: 0,
            end_index: None,
            grid: GridSpec::default(),
        }
    }
}

/// The candidate lists for every searchable parameter.
///
/// A parameter that is absent contributes a single "unset" value to the
/// cartesian product.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GridSpec {
    pub rule_type: Option<OneOrMany<RuleKind>>,
    pub buy_signal_threshold: Option<ParameterRange>,
    pub buy_signal_threshold_2: Option<ParameterRange>,
    pub sell_signal_threshold: Option<ParameterRange>,
    pub sell_signal_threshold_2: Option<ParameterRange>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T: Clone> OneOrMany<T> {
    pub fn to_vec(&self) -> Vec<T> {
        match self {
            OneOrMany::One(value) => vec![value.clone()],
            OneOrMany::Many(values) => values.clone(),
        }
    }
}

/// Represents the candidate values for a single threshold parameter.
///
/// Accepted forms:
/// - a literal list: `[0.1, 0.2, 0.3]`
/// - a range table: `{ start = 0.1, end = 0.3, step = 0.1 }` (inclusive)
/// - a range string `"start:stop:step"` (inclusive), a comma list `"0.1, 0.2"`, or a single number
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ParameterRange {
    Discrete(Vec<f64>),
    Linear { start: f64, end: f64, step: f64 },
    Single(f64),
    Expression(String),
}

impl ParameterRange {
    /// Expands this range into its concrete list of values.
    pub fn expand(&self, name: &str) -> Result<Vec<f64>, ConfigError> {
        let values = match self {
            ParameterRange::Discrete(values) => values.clone(),
            ParameterRange::Linear { start, end, step } => linear(name, *start, *end, *step)?,
            ParameterRange::Single(value) => vec![*value],
            ParameterRange::Expression(expr) => parse_expression(name, expr)?,
        };
        if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
            return Err(ConfigError::ValidationError(format!(
                "Value {} for '{}' is not a finite number.",
                bad, name
            )));
        }
        Ok(values)
    }
}

/// Parses the small list/range grammar used in grid strings.
///
/// ```text
/// expr  := range | list
/// range := number ":" number ":" number
/// list  := number ("," number)*     (optionally wrapped in "[" "]")
/// ```
pub fn parse_expression(name: &str, expr: &str) -> Result<Vec<f64>, ConfigError> {
    let trimmed = expr.trim();
    if trimmed.contains(':') {
        let parts: Vec<&str> = trimmed.split(':').collect();
        if parts.len() != 3 {
            return Err(ConfigError::ValidationError(format!(
                "Range for '{}' must have the form start:stop:step, got '{}'.",
                name, expr
            )));
        }
        let start = parse_number(name, parts[0])?;
        let stop = parse_number(name, parts[1])?;
        let step = parse_number(name, parts[2])?;
        return linear(name, start, stop, step);
    }

    let inner = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(trimmed);
    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }
    inner.split(',').map(|item| parse_number(name, item)).collect()
}

/// Inclusive arithmetic range. Values are computed as `start + i * step`
/// rather than by accumulation so that float error does not drift.
fn linear(name: &str, start: f64, end: f64, step: f64) -> Result<Vec<f64>, ConfigError> {
    if !start.is_finite() || !end.is_finite() || !step.is_finite() {
        return Err(ConfigError::ValidationError(format!(
            "Range for '{}' must use finite numbers.",
            name
        )));
    }
    if step == 0.0 {
        return Err(ConfigError::ValidationError(format!(
            "Step for '{}' must not be zero.",
            name
        )));
    }
    if (end - start) * step < 0.0 {
        return Err(ConfigError::ValidationError(format!(
            "Step for '{}' points away from the end of the range ({} -> {} by {}).",
            name, start, end, step
        )));
    }

    let steps = ((end - start) / step + 1e-9).floor();
    if steps + 1.0 > MAX_RANGE_VALUES as f64 {
        return Err(ConfigError::ValidationError(format!(
            "Range for '{}' expands to more than {} values.",
            name, MAX_RANGE_VALUES
        )));
    }

    let count = steps as usize + 1;
    Ok((0..count)
        .map(|i| round_to_grid(start + i as f64 * step))
        .collect())
}

fn round_to_grid(value: f64) -> f64 {
    (value * 1e12).round() / 1e12
}

fn parse_number(name: &str, text: &str) -> Result<f64, ConfigError> {
    text.trim().parse::<f64>().map_err(|_| {
        ConfigError::ValidationError(format!(
            "'{}' in the grid for '{}' is not a number.",
            text.trim(),
            name
        ))
    })
}

impl TrainSignalModelConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.top_n == 0 {
            return Err(ConfigError::ValidationError(
                "`train_signal_model.top_n` must be positive".to_string(),
            ));
        }
        if let Some(end) = self.end_index {
            if end <= self.start_index {
                return Err(ConfigError::ValidationError(format!(
                    "`train_signal_model.end_index` ({}) must be greater than `start_index` ({})",
                    end, self.start_index
                )));
            }
        }
        if self.buy_sell_equal
            && (self.grid.sell_signal_threshold.is_some()
                || self.grid.sell_signal_threshold_2.is_some())
        {
            return Err(ConfigError::ValidationError(
                "`buy_sell_equal` derives the sell thresholds; remove them from the grid".to_string(),
            ));
        }

        // Expand every range once so that malformed expressions fail before any work starts.
        let dims = [
            ("buy_signal_threshold", &self.grid.buy_signal_threshold),
            ("buy_signal_threshold_2", &self.grid.buy_signal_threshold_2),
            ("sell_signal_threshold", &self.grid.sell_signal_threshold),
            ("sell_signal_threshold_2", &self.grid.sell_signal_threshold_2),
        ];
        for (name, range) in dims {
            if let Some(range) = range {
                range.expand(name)?;
            }
        }
        Ok(())
    }
}

fn default_top_n() -> usize {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: &[f64], b: &[f64]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-9)
    }

    #[test]
    fn range_string_is_inclusive_of_its_stop() {
        let values = parse_expression("buy", "0.1:0.3:0.1").unwrap();
        assert!(close(&values, &[0.1, 0.2, 0.3]), "{values:?}");
    }

    #[test]
    fn descending_range_needs_a_negative_step() {
        let values = parse_expression("sell", "-0.1:-0.3:-0.1").unwrap();
        assert!(close(&values, &[-0.1, -0.2, -0.3]), "{values:?}");

        assert!(parse_expression("sell", "-0.1:-0.3:0.1").is_err());
    }

    #[test]
    fn comma_and_bracket_lists_are_accepted() {
        assert!(close(&parse_expression("b", "0.5, 1, 1.5").unwrap(), &[0.5, 1.0, 1.5]));
        assert!(close(&parse_expression("b", "[0.5,1]").unwrap(), &[0.5, 1.0]));
        assert!(parse_expression("b", "[]").unwrap().is_empty());
    }

    #[test]
    fn malformed_expressions_are_rejected() {
        for expr in ["0.1:0.2", "0:1:0", "abc", "np.arange(0, 1, 0.1)", "0.1,,0.2", "0:1e9:1e-9"] {
            let result = parse_expression("buy", expr);
            assert!(
                matches!(result, Err(ConfigError::ValidationError(_))),
                "expected validation error for {expr:?}, got {result:?}"
            );
        }
    }

    #[test]
    fn table_ranges_expand_like_strings() {
        let table = ParameterRange::Linear { start: 0.0, end: 0.2, step: 0.05 };
        let string = ParameterRange::Expression("0.0:0.2:0.05".to_string());
        assert_eq!(table.expand("x").unwrap(), string.expand("x").unwrap());
        assert_eq!(table.expand("x").unwrap().len(), 5);
    }

    #[test]
    fn symmetric_grid_must_not_configure_sell_thresholds() {
        let config = TrainSignalModelConfig {
            buy_sell_equal: true,
            grid: GridSpec {
                buy_signal_threshold: Some(ParameterRange::Single(0.1)),
                sell_signal_threshold: Some(ParameterRange::Single(-0.1)),
                ..GridSpec::default()
            },
            ..TrainSignalModelConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
