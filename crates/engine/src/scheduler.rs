use crate::AppContext;
use crate::error::EngineError;
use crate::health::{HealthState, check_provider};
use crate::market::{BarBuffer, cold_start_sync, incremental_sync};
use alerter::format_status_line;
use backtester::PositionState;
use chrono::{DateTime, Utc};
use core_types::{Direction, TradeStatus, Transition};
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::Instrument;

/// Drives the live cycle.
///
/// The scheduler owns the bar window and the trade status. A cycle works on
/// copies of both and commits them only when every step succeeded, so a failed
/// cycle leaves the previous state in place. The trade status is re-read from
/// the account at the start of every cycle before any decision is made.
pub struct LiveScheduler {
    ctx: AppContext,
    health: HealthState,
    bars: BarBuffer,
    status: TradeStatus,
}

impl LiveScheduler {
    pub fn new(ctx: AppContext) -> Self {
        let capacity = ctx.config.trader.history_bars;
        Self {
            ctx,
            health: HealthState::default(),
            bars: BarBuffer::new(capacity),
            status: TradeStatus::default(),
        }
    }

    pub fn status(&self) -> &TradeStatus {
        &self.status
    }

    pub fn health(&self) -> &HealthState {
        &self.health
    }

    pub fn bars(&self) -> &BarBuffer {
        &self.bars
    }

    /// Health check, cold-start sync and reconciliation, in that order.
    ///
    /// Each step only runs if the previous one succeeded.
    pub async fn startup(&mut self) -> Result<(), EngineError> {
        let config = &self.ctx.config;

        self.health =
            check_provider(self.ctx.api_client.as_ref(), config.trader.max_clock_skew_ms).await;
        if !self.health.provider_ok {
            let reason = self.health.last_error.clone().unwrap_or_default();
            return Err(EngineError::Unhealthy(reason));
        }
        tracing::info!("Finished health check");

        self.bars = cold_start_sync(
            self.ctx.api_client.as_ref(),
            &config.symbol,
            &config.trader.kline_interval,
            config.trader.history_bars,
            Utc::now(),
        )
        .await?;
        tracing::info!(bars = self.bars.len(), "Finished initial data collection");

        self.status = self.ctx.executor.reconcile().await?;
        tracing::info!(
            status = %self.status.status,
            base = %self.status.base_quantity,
            quote = %self.status.quote_quantity,
            open_orders = self.status.open_orders.len(),
            "Finished trade status sync"
        );
        Ok(())
    }

    /// Runs startup, then one cycle per timer tick until `shutdown` turns true.
    ///
    /// A startup failure is returned before the timer is started. Cycle
    /// failures are logged and never end the loop. On shutdown the cycle in
    /// progress completes and the timer task is joined before returning.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), EngineError> {
        self.startup().await?;

        let (tick_tx, mut tick_rx) = mpsc::channel(1);
        let cadence = self.ctx.config.trader.cadence;
        let timer = tokio::spawn(run_timer(cadence, tick_tx, shutdown.clone()));
        tracing::info!(?cadence, "Scheduler started");

        loop {
            tokio::select! {
                biased;
                _ = stopped(&mut shutdown) => break,
                tick = tick_rx.recv() => match tick {
                    Some(at) => self.tick(at).await,
                    None => break,
                },
            }
        }

        drop(tick_rx);
        timer.await?;
        tracing::info!("Scheduler stopped");
        Ok(())
    }

    async fn tick(&mut self, at: DateTime<Utc>) {
        let span = tracing::info_span!("cycle", at = %at.format("%H:%M:%S"));
        if let Err(e) = self.run_cycle(at).instrument(span).await {
            tracing::error!(error = %e, "Cycle failed; skipping until the next tick");
        }
    }

    /// Runs one cycle as of `now` and returns the transition that was carried out.
    pub async fn run_cycle(&mut self, now: DateTime<Utc>) -> Result<Transition, EngineError> {
        let config = &self.ctx.config;
        let mut bars = self.bars.clone();

        incremental_sync(
            self.ctx.api_client.as_ref(),
            &mut bars,
            &config.symbol,
            &config.trader.kline_interval,
            now,
        )
        .await?;
        let bar = bars
            .latest_closed(now)
            .cloned()
            .ok_or_else(|| EngineError::DataUnavailable("no closed bar yet".to_string()))?;

        let sample = self.ctx.scores.score_at(bar.open_time).await?;
        let signal = self.ctx.rule.evaluate(&sample);

        // An earlier cycle may have placed an order and failed before committing.
        let status = self.ctx.executor.reconcile().await?;
        if status.status != self.status.status {
            tracing::warn!(
                cached = %self.status.status,
                account = %status.status,
                "Account state changed since the last cycle"
            );
        }

        let mut transition = PositionState::from(status.status).step(signal);
        if transition == Transition::Open(Direction::Short) && !config.trader.allow_short {
            tracing::debug!("Short entries are disabled; holding");
            transition = Transition::Hold;
        }

        let price = bar.price(config.columns.price);
        let status = self.ctx.executor.execute(transition, price, &status).await?;

        self.bars = bars;
        self.status = status;
        tracing::info!(
            bar = %bar.open_time,
            buy = signal.is_buy,
            sell = signal.is_sell,
            ?transition,
            status = %self.status.status,
            "Cycle complete"
        );

        let line = format_status_line(self.status.status, sample.buy_score, price);
        if let Err(e) = self.ctx.notifier.notify(&line).await {
            tracing::warn!(error = %e, "Failed to send status notification");
        }
        Ok(transition)
    }
}

/// Resolves once shutdown is requested or the sender is gone.
async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// Time left until the next wall-clock multiple of `cadence`.
fn delay_to_next_boundary(cadence: Duration, now: DateTime<Utc>) -> Duration {
    let period = i64::try_from(cadence.as_millis()).unwrap_or(i64::MAX).max(1);
    let elapsed = now.timestamp_millis().rem_euclid(period);
    let delay = (period - elapsed) % period;
    Duration::from_millis(u64::try_from(delay).unwrap_or_default())
}

/// Emits one tick per `cadence`, aligned to wall-clock boundaries.
///
/// The hand-off never blocks: if the previous tick has not been picked up yet,
/// the new one is dropped.
async fn run_timer(
    cadence: Duration,
    tick_tx: mpsc::Sender<DateTime<Utc>>,
    mut shutdown: watch::Receiver<bool>,
) {
    let start = Instant::now() + delay_to_next_boundary(cadence, Utc::now());
    let mut timer = time::interval_at(start, cadence);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = stopped(&mut shutdown) => break,
            _ = timer.tick() => match tick_tx.try_send(Utc::now()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    tracing::warn!("Previous cycle still running; tick dropped");
                }
                Err(TrySendError::Closed(_)) => break,
            },
        }
    }
    tracing::debug!("Timer stopped");
}
