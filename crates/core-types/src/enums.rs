use serde::{Deserialize, Serialize};
use std::fmt;

/// The direction of a simulated or live position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    Market,
}

/// The live trading status tracked by the scheduler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionStatus {
    #[default]
    Idle,
    Long,
    Short,
}

impl fmt::Display for PositionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PositionStatus::Idle => "Idle",
            PositionStatus::Long => "Long",
            PositionStatus::Short => "Short",
        };
        f.write_str(s)
    }
}

/// Selects how a threshold rule reads the score columns.
///
/// The serialized names match the `rule_type` values used in configuration
/// files and in the grid-search artifact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleKind {
    #[default]
    #[serde(rename = "one_dim_rule", alias = "one_dimensional")]
    OneDimensional,
    #[serde(rename = "two_dim_rule", alias = "two_dimensional")]
    TwoDimensional,
}

impl RuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::OneDimensional => "one_dim_rule",
            RuleKind::TwoDimensional => "two_dim_rule",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which bar price trades are simulated and executed at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceColumn {
    Open,
    High,
    Low,
    #[default]
    Close,
}

impl PriceColumn {
    /// The column header used for this price in input tables.
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceColumn::Open => "open",
            PriceColumn::High => "high",
            PriceColumn::Low => "low",
            PriceColumn::Close => "close",
        }
    }
}

/// The outcome of feeding one signal into the position state machine.
///
/// At most one transition happens per step: a step that closes a position
/// never opens a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition {
    Hold,
    Open(Direction),
    Close(Direction),
}
