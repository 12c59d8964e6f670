//! # Signal Rules
//!
//! This crate turns model scores into discrete buy/sell decisions. It defines the
//! `SignalModel` trait and the threshold rule that the backtester, the optimizer
//! and the live engine all share.
//!
//! ## Architectural Principles
//!
//! - **Pure Logic:** No I/O, no clocks, no state between samples. The same sample
//!   always yields the same `Signal`.
//! - **Shared Decision Path:** The offline grid search and the live scheduler call
//!   the exact same `evaluate`, so a backtested rule behaves identically in production.
//!
//! ## Public API
//!
//! - `SignalModel`: The trait all signal rules implement.
//! - `ThresholdRule`: The one- and two-dimensional threshold rule.
//! - `create_rule`: Builds the live rule from `[signal_model]`.

pub mod error;
pub mod factory;
pub mod threshold;

pub use error::StrategyError;
pub use factory::create_rule;
pub use threshold::ThresholdRule;

use core_types::{ScoreSample, Signal};

/// The core trait that all signal rules implement.
///
/// Evaluation takes `&self`: rules are stateless, so one instance can be shared
/// across the rayon pool in the optimizer and behind an `Arc` in the live engine.
pub trait SignalModel: Send + Sync {
    /// Evaluates a single score sample.
    fn evaluate(&self, sample: &ScoreSample) -> Signal;

    /// Evaluates a whole series. The output has exactly one signal per input sample.
    fn evaluate_series(&self, samples: &[ScoreSample]) -> Vec<Signal> {
        samples.iter().map(|sample| self.evaluate(sample)).collect()
    }
}
