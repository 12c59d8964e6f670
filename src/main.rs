use alerter::{LogNotifier, Notifier, TelegramAlerter, error::AlerterError};
use anyhow::Context;
use api_client::{ApiClient, BinanceClient};
use backtester::{FrameOptions, load_signal_frame};
use clap::{Parser, Subcommand};
use comfy_table::{Table, presets::UTF8_FULL};
use configuration::{Config, load_config};
use engine::{AppContext, CsvScoreSource, LiveScheduler};
use executor::{LiveExecutor, PaperExecutor, TradeExecutor};
use optimizer::{ParameterSearchEngine, RankedPoint, append_results};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use strategies::create_rule;
use tokio::sync::watch;

/// The main entry point for the signaler application.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Secrets usually come from a .env file; it is optional.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    let _log_guard = configuration::init_tracing(&config.logging)?;

    match cli.command {
        Commands::TrainSignals(args) => handle_train_signals(config, args).await,
        Commands::Serve => handle_serve(config).await,
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Searches score thresholds offline and trades the chosen rule live.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grid-search threshold rules over the score table and append the best ones to the models file.
    TrainSignals(TrainSignalsArgs),
    /// Run the live scheduler until Ctrl-C.
    Serve,
}

#[derive(Parser)]
struct TrainSignalsArgs {
    /// Hide the progress bar.
    #[arg(long)]
    no_progress: bool,

    /// Overrides `train_signal_model.top_n`.
    #[arg(long)]
    top_n: Option<usize>,
}

// ==============================================================================
// Offline Grid Search
// ==============================================================================

async fn handle_train_signals(mut config: Config, args: TrainSignalsArgs) -> anyhow::Result<()> {
    if let Some(top_n) = args.top_n {
        anyhow::ensure!(top_n > 0, "--top-n must be positive");
        config.train_signal_model.top_n = top_n;
    }

    let started = Instant::now();
    let data_path = config.signal_file_path();
    let models_path = config.signal_models_file_path();
    let artifact = models_path.clone();
    tracing::info!(symbol = %config.symbol, path = %data_path.display(), "Starting grid search");

    // Loading and backtesting are CPU-bound; keep them off the async workers.
    let (points, written) = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        let frame = load_signal_frame(&data_path, &FrameOptions::from_config(&config))
            .with_context(|| format!("Failed to load score table {}", data_path.display()))?;
        tracing::info!(rows = frame.len(), "Loaded score table");

        let engine = ParameterSearchEngine::new(
            config.train_signal_model.clone(),
            config.signal_model.rule_type,
        )
        .with_progress(!args.no_progress);
        let points = engine.run(&frame)?;

        let written = append_results(&models_path, &points)
            .with_context(|| format!("Failed to write {}", models_path.display()))?;
        Ok((points, written))
    })
    .await??;

    if points.is_empty() {
        println!("No grid points were evaluated; nothing was written.");
    } else {
        println!("{}", results_table(&points));
    }

    println!("Finished grid search in {:.1?}.", started.elapsed());
    println!("Appended {} rows to {}", written, artifact.display());
    Ok(())
}

fn results_table(points: &[RankedPoint]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "#", "rule", "buy", "buy_2", "sell", "sell_2", "%/month", "profitable", "%/trade", "trades/month",
    ]);

    let optional = |value: Option<f64>| value.map(|v| format!("{:.3}", v)).unwrap_or_default();
    for (rank, point) in points.iter().enumerate() {
        let rule = &point.rule;
        let overall = &point.report.overall;
        table.add_row(vec![
            (rank + 1).to_string(),
            rule.kind().as_str().to_string(),
            format!("{:.3}", rule.buy_threshold()),
            optional(rule.buy_threshold_2()),
            format!("{:.3}", rule.sell_threshold()),
            optional(rule.sell_threshold_2()),
            format!("{:.3}", overall.profit_pct_per_month),
            format!("{:.3}", overall.profitable_fraction),
            format!("{:.3}", overall.profit_pct_per_transaction),
            format!("{:.3}", overall.transactions_per_month),
        ]);
    }
    table
}

// ==============================================================================
// Live Scheduler
// ==============================================================================

async fn handle_serve(config: Config) -> anyhow::Result<()> {
    tracing::info!(symbol = %config.symbol, paper = config.trader.paper_trading, "Initializing signaler server");

    let rule = create_rule(&config.signal_model).context("Invalid [signal_model]")?;
    let api_client: Arc<dyn ApiClient> =
        Arc::new(BinanceClient::new(&config.api, config.trader.request_timeout)?);

    let executor: Arc<dyn TradeExecutor> = if config.trader.paper_trading {
        Arc::new(PaperExecutor::new(&config.trader))
    } else {
        Arc::new(LiveExecutor::new(Arc::clone(&api_client), &config.symbol, config.trader.clone()))
    };

    let notifier: Arc<dyn Notifier> = match TelegramAlerter::new(&config.telegram, config.trader.request_timeout) {
        Ok(alerter) => Arc::new(alerter),
        Err(AlerterError::NotConfigured) => {
            tracing::warn!("Telegram alerter is not configured; status lines go to the log.");
            Arc::new(LogNotifier)
        }
        Err(e) => return Err(e.into()),
    };

    let scores = Arc::new(CsvScoreSource::new(
        config.signal_file_path(),
        FrameOptions::scores_only(&config),
    ));

    let scheduler = LiveScheduler::new(AppContext {
        config,
        rule: Arc::new(rule),
        api_client,
        scores,
        executor,
        notifier,
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut run = tokio::spawn(scheduler.run(shutdown_rx));

    tokio::select! {
        result = &mut run => return Ok(result??),
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            tracing::info!("Ctrl-C received; finishing the current cycle");
        }
    }

    shutdown_tx.send(true).ok();
    run.await??;
    Ok(())
}
