use crate::error::StrategyError;
use crate::threshold::ThresholdRule;
use configuration::SignalModelConfig;

/// Creates the live threshold rule from the `[signal_model]` section.
pub fn create_rule(config: &SignalModelConfig) -> Result<ThresholdRule, StrategyError> {
    let buy = config.buy_signal_threshold.ok_or_else(|| {
        StrategyError::InvalidParameters("`signal_model.buy_signal_threshold` is required".to_string())
    })?;

    if config.buy_sell_equal {
        return ThresholdRule::symmetric(config.rule_type, buy, config.buy_signal_threshold_2);
    }

    let sell = config.sell_signal_threshold.ok_or_else(|| {
        StrategyError::InvalidParameters(
            "`signal_model.sell_signal_threshold` is required unless `buy_sell_equal` is set"
                .to_string(),
        )
    })?;
    ThresholdRule::new(
        config.rule_type,
        buy,
        config.buy_signal_threshold_2,
        sell,
        config.sell_signal_threshold_2,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::RuleKind;

    #[test]
    fn symmetric_config_mirrors_the_buy_threshold() {
        let config = SignalModelConfig {
            rule_type: RuleKind::OneDimensional,
            buy_signal_threshold: Some(0.3),
            buy_sell_equal: true,
            ..SignalModelConfig::default()
        };
        let rule = create_rule(&config).unwrap();
        assert!(rule.is_symmetric());
        assert_eq!(rule.sell_threshold(), -0.3);
    }

    #[test]
    fn missing_sell_threshold_is_rejected() {
        let config = SignalModelConfig {
            buy_signal_threshold: Some(0.3),
            ..SignalModelConfig::default()
        };
        assert!(matches!(create_rule(&config), Err(StrategyError::InvalidParameters(_))));
    }
}
