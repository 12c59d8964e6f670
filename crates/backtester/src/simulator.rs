use crate::data_handler::SignalFrame;
use crate::error::BacktestError;
use analytics::{AnalyticsEngine, PerformanceReport};
use chrono::{DateTime, Utc};
use core_types::{Direction, PositionStatus, Signal, Trade, Transition};
use strategies::SignalModel;

/// The position state machine shared by the simulator and the live engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PositionState {
    #[default]
    Flat,
    Long,
    Short,
}

impl PositionState {
    /// Decides the transition for one signal. Never more than one per step.
    ///
    /// An open position is closed by the opposing signal even when both signals
    /// fire; the new position, if any, is only opened on a later step. Signals
    /// in the direction of the open position are ignored.
    pub fn step(self, signal: Signal) -> Transition {
        match self {
            PositionState::Flat => match (signal.is_buy, signal.is_sell) {
                (true, false) => Transition::Open(Direction::Long),
                (false, true) => Transition::Open(Direction::Short),
                _ => Transition::Hold,
            },
            PositionState::Long if signal.is_sell => Transition::Close(Direction::Long),
            PositionState::Short if signal.is_buy => Transition::Close(Direction::Short),
            PositionState::Long | PositionState::Short => Transition::Hold,
        }
    }

    /// The state after a transition has been carried out.
    pub fn apply(self, transition: Transition) -> Self {
        match transition {
            Transition::Hold => self,
            Transition::Open(Direction::Long) => PositionState::Long,
            Transition::Open(Direction::Short) => PositionState::Short,
            Transition::Close(_) => PositionState::Flat,
        }
    }
}

impl From<PositionStatus> for PositionState {
    fn from(status: PositionStatus) -> Self {
        match status {
            PositionStatus::Idle => PositionState::Flat,
            PositionStatus::Long => PositionState::Long,
            PositionStatus::Short => PositionState::Short,
        }
    }
}

impl From<PositionState> for PositionStatus {
    fn from(state: PositionState) -> Self {
        match state {
            PositionState::Flat => PositionStatus::Idle,
            PositionState::Long => PositionStatus::Long,
            PositionState::Short => PositionStatus::Short,
        }
    }
}

/// The trades of one simulation and the metrics derived from them.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationOutcome {
    pub trades: Vec<Trade>,
    pub report: PerformanceReport,
}

/// Replays a signal series against the prices of a `SignalFrame`.
#[derive(Debug, Default)]
pub struct TradeSimulator {
    analytics_engine: AnalyticsEngine,
}

impl TradeSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluates `model` over the frame and simulates the resulting signals.
    pub fn backtest(
        &self,
        frame: &SignalFrame,
        model: &dyn SignalModel,
    ) -> Result<SimulationOutcome, BacktestError> {
        let signals = model.evaluate_series(frame.samples());
        self.simulate(frame, &signals)
    }

    /// Runs the state machine over `signals`, one per frame sample.
    ///
    /// Samples without a usable price (missing, non-finite or not positive) are
    /// skipped entirely. A position still open after the last priced sample is
    /// closed there and marked `forced`.
    pub fn simulate(
        &self,
        frame: &SignalFrame,
        signals: &[Signal],
    ) -> Result<SimulationOutcome, BacktestError> {
        if signals.len() != frame.len() {
            return Err(BacktestError::MisalignedSeries {
                samples: frame.len(),
                signals: signals.len(),
            });
        }

        let mut state = PositionState::Flat;
        let mut entry: Option<(DateTime<Utc>, f64)> = None;
        let mut last_priced: Option<(DateTime<Utc>, f64)> = None;
        let mut trades = Vec::new();

        let rows = frame.samples().iter().zip(frame.prices()).zip(signals);
        for ((sample, price), signal) in rows {
            let Some(price) = price.filter(|p| p.is_finite() && *p > 0.0) else {
                continue;
            };
            let now = sample.timestamp;
            last_priced = Some((now, price));

            let transition = state.step(*signal);
            match transition {
                Transition::Hold => {}
                Transition::Open(_) => entry = Some((now, price)),
                Transition::Close(direction) => {
                    if let Some((open_time, open_price)) = entry.take() {
                        trades.push(Trade::new(direction, open_time, open_price, now, price, false));
                    }
                }
            }
            state = state.apply(transition);
        }

        if let (Some((open_time, open_price)), Some((close_time, close_price))) = (entry, last_priced) {
            let direction = match state {
                PositionState::Short => Direction::Short,
                _ => Direction::Long,
            };
            trades.push(Trade::new(direction, open_time, open_price, close_time, close_price, true));
        }

        let report = self.analytics_engine.calculate(&trades, frame.months()?);
        Ok(SimulationOutcome { trades, report })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use core_types::{RuleKind, ScoreSample};
    use proptest::prelude::*;
    use strategies::ThresholdRule;

    fn ts(i: usize) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(i as i64)
    }

    fn frame(prices: &[f64]) -> SignalFrame {
        let samples = (0..prices.len()).map(|i| ScoreSample::new(ts(i), 0.0, 0.0)).collect();
        SignalFrame::new(samples, prices.iter().copied().map(Some).collect()).unwrap()
    }

    fn signals(buy: &[bool], sell: &[bool]) -> Vec<Signal> {
        buy.iter().zip(sell).map(|(b, s)| Signal::new(*b, *s)).collect()
    }

    #[test]
    fn long_round_trip_loses_one_percent() {
        let frame = frame(&[100.0, 101.0, 99.0, 102.0, 103.0]);
        let signals = signals(&[true, false, false, false, false], &[false, false, true, false, false]);

        let outcome = TradeSimulator::new().simulate(&frame, &signals).unwrap();

        assert_eq!(outcome.trades.len(), 1);
        let trade = &outcome.trades[0];
        assert_eq!(trade.direction, Direction::Long);
        assert_eq!((trade.open_price, trade.close_price), (100.0, 99.0));
        assert!((trade.profit_pct - -1.0).abs() < 1e-12);
        assert_eq!(outcome.report.overall.transaction_count, 1);
        assert_eq!(outcome.report.overall.profitable_fraction, 0.0);
    }

    #[test]
    fn both_signals_while_long_close_without_reopening() {
        let frame = frame(&[100.0, 110.0, 120.0]);
        let signals = signals(&[true, true, false], &[false, true, false]);

        let outcome = TradeSimulator::new().simulate(&frame, &signals).unwrap();

        assert_eq!(outcome.trades.len(), 1);
        assert!(!outcome.trades[0].forced);
        assert_eq!(outcome.trades[0].close_time, ts(1));
    }

    #[test]
    fn step_closes_before_it_opens() {
        let both = Signal::new(true, true);
        assert_eq!(PositionState::Long.step(both), Transition::Close(Direction::Long));
        assert_eq!(PositionState::Short.step(both), Transition::Close(Direction::Short));
        assert_eq!(PositionState::Flat.step(both), Transition::Hold);
        assert_eq!(PositionState::Long.apply(Transition::Close(Direction::Long)), PositionState::Flat);
    }

    #[test]
    fn repeated_buys_do_not_pyramid() {
        let frame = frame(&[100.0, 90.0, 80.0, 120.0]);
        let signals = signals(&[true, true, true, false], &[false, false, false, true]);

        let outcome = TradeSimulator::new().simulate(&frame, &signals).unwrap();

        assert_eq!(outcome.trades.len(), 1);
        assert_eq!(outcome.trades[0].open_price, 100.0);
        assert!((outcome.trades[0].profit_pct - 20.0).abs() < 1e-9);
    }

    #[test]
    fn open_position_is_force_closed_at_the_end() {
        let frame = frame(&[100.0, 101.0, 95.0]);
        let signals = signals(&[false, false, false], &[true, false, false]);

        let outcome = TradeSimulator::new().simulate(&frame, &signals).unwrap();

        assert_eq!(outcome.trades.len(), 1);
        let trade = &outcome.trades[0];
        assert!(trade.forced);
        assert_eq!(trade.direction, Direction::Short);
        assert!((trade.profit_pct - 5.0).abs() < 1e-9);
        assert_eq!(outcome.report.overall.transaction_count, 0);
        assert_eq!(outcome.report.overall.profit_pct_per_transaction, 0.0);
        assert!((outcome.report.overall.profit_total_pct - 5.0).abs() < 1e-9);
    }

    #[test]
    fn no_signals_means_no_trades() {
        let frame = frame(&[100.0, 101.0, 102.0]);
        let outcome = TradeSimulator::new().simulate(&frame, &[Signal::NONE; 3]).unwrap();
        assert!(outcome.trades.is_empty());
        assert_eq!(outcome.report.overall.transaction_count, 0);
        assert_eq!(outcome.report.overall.profit_pct_per_transaction, 0.0);
    }

    #[test]
    fn unpriced_samples_are_skipped() {
        let samples = (0..4).map(|i| ScoreSample::new(ts(i), 0.0, 0.0)).collect();
        let frame = SignalFrame::new(samples, vec![Some(100.0), None, Some(0.0), Some(110.0)]).unwrap();
        // The sell on the unpriced sample is ignored; the position closes on the last one.
        let signals = signals(&[true, false, false, false], &[false, true, true, true]);

        let outcome = TradeSimulator::new().simulate(&frame, &signals).unwrap();

        assert_eq!(outcome.trades.len(), 1);
        assert_eq!(outcome.trades[0].close_price, 110.0);
        assert!(!outcome.trades[0].forced);
    }

    #[test]
    fn mismatched_signal_length_is_an_error() {
        let frame = frame(&[100.0, 101.0]);
        assert!(matches!(
            TradeSimulator::new().simulate(&frame, &[Signal::NONE]),
            Err(BacktestError::MisalignedSeries { samples: 2, signals: 1 })
        ));
    }

    proptest! {
        #[test]
        fn symmetric_rule_backtests_like_its_explicit_mirror(
            rows in prop::collection::vec((-1.0f64..1.0, -1.0f64..1.0, 1.0f64..200.0), 1..150),
            buy in 0.0f64..1.0,
        ) {
            let samples = rows
                .iter()
                .enumerate()
                .map(|(i, (b, s, _))| ScoreSample::new(ts(i), *b, *s))
                .collect();
            let prices = rows.iter().map(|(_, _, p)| Some(*p)).collect();
            let frame = SignalFrame::new(samples, prices).unwrap();

            let symmetric = ThresholdRule::symmetric(RuleKind::OneDimensional, buy, None).unwrap();
            let explicit = ThresholdRule::new(RuleKind::OneDimensional, buy, None, -buy, None).unwrap();

            let simulator = TradeSimulator::new();
            let a = simulator.backtest(&frame, &symmetric).unwrap();
            let b = simulator.backtest(&frame, &explicit).unwrap();
            prop_assert_eq!(a.report, b.report);
            prop_assert_eq!(a.trades, b.trades);
        }
    }
}
