use crate::error::OptimizerError;
use configuration::{ParameterRange, TrainSignalModelConfig};
use core_types::RuleKind;
use itertools::iproduct;
use strategies::ThresholdRule;

/// Generates every rule in the grid, in enumeration order.
///
/// Dimensions are combined as rule kind, buy, buy_2, sell, sell_2 with the last
/// one varying fastest. An absent optional dimension contributes a single unset
/// value. With `buy_sell_equal`, the sell dimensions are not searched and each
/// rule mirrors its buy thresholds.
pub fn generate_rules(
    config: &TrainSignalModelConfig,
    default_kind: RuleKind,
) -> Result<Vec<ThresholdRule>, OptimizerError> {
    let grid = &config.grid;

    let kinds = grid
        .rule_type
        .as_ref()
        .map(|kinds| kinds.to_vec())
        .unwrap_or_else(|| vec![default_kind]);
    let buys = required(&grid.buy_signal_threshold, "buy_signal_threshold")?;
    let buys_2 = optional(&grid.buy_signal_threshold_2, "buy_signal_threshold_2")?;

    if config.buy_sell_equal {
        return iproduct!(kinds, buys, buys_2)
            .map(|(kind, buy, buy_2)| {
                ThresholdRule::symmetric(kind, buy, buy_2).map_err(OptimizerError::from)
            })
            .collect();
    }

    let sells = required(&grid.sell_signal_threshold, "sell_signal_threshold")?;
    let sells_2 = optional(&grid.sell_signal_threshold_2, "sell_signal_threshold_2")?;

    iproduct!(kinds, buys, buys_2, sells, sells_2)
        .map(|(kind, buy, buy_2, sell, sell_2)| {
            ThresholdRule::new(kind, buy, buy_2, sell, sell_2).map_err(OptimizerError::from)
        })
        .collect()
}

fn required(range: &Option<ParameterRange>, name: &str) -> Result<Vec<f64>, OptimizerError> {
    match range {
        Some(range) => Ok(range.expand(name)?),
        None => Err(OptimizerError::ParameterGeneration(format!(
            "'{}' must be part of the grid.",
            name
        ))),
    }
}

fn optional(range: &Option<ParameterRange>, name: &str) -> Result<Vec<Option<f64>>, OptimizerError> {
    match range {
        Some(range) => Ok(range.expand(name)?.into_iter().map(Some).collect()),
        None => Ok(vec![None]),
    }
}
