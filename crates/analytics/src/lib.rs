//! # Analytics Engine
//!
//! This crate turns the trades produced by the simulator into performance metrics.
//! It acts as the "unbiased judge" of a threshold rule.
//!
//! ## Architectural Principles
//!
//! - **Pure Logic:** It has no knowledge of external systems and depends only on `core-types`.
//! - **Stateless Calculation:** The `AnalyticsEngine` takes trades and the simulation span
//!   as input and produces a `PerformanceReport`. Undefined ratios (no trades, zero span)
//!   are reported as `0.0` rather than as errors.
//!
//! ## Public API
//!
//! - `AnalyticsEngine`: The calculation logic.
//! - `PerformanceRecord`, `PerformanceReport`: The overall and per-direction metrics.
//! - `months_between`: Converts a time span into 30.5-day months.

pub mod engine;
pub mod error;
pub mod report;

pub use engine::{AnalyticsEngine, DAYS_PER_MONTH, months_between};
pub use error::AnalyticsError;
pub use report::{PerformanceRecord, PerformanceReport};
