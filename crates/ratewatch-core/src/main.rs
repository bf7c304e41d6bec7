//! RateWatch CLI
//!
//! Command-line interface for the RateWatch exchange-rate monitor.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;

use ratewatch::alerting::{
    build_payload, AlertDispatcher, AlertSender, LogAlertSender, NotificationCache,
    SmtpAlertSender, ThresholdEvaluator,
};
use ratewatch::clock::{Clock, SystemClock};
use ratewatch::fetcher::{ExchangeRateApiFetcher, RateFetcher};
use ratewatch::models::{Condition, CycleOutcome, RateReading};
use ratewatch::scheduler::{CheckCycle, CheckCycleOrchestrator};
use ratewatch::Config;

/// RateWatch - exchange-rate threshold alerts
#[derive(Parser)]
#[command(name = "ratewatch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path (TOML, YAML or JSON)
    #[arg(short, long, global = true, env = "RATEWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (for commands that support it)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Monitor the exchange rate until interrupted
    Run {
        /// Log alerts instead of emailing them
        #[arg(long)]
        dry_run: bool,
    },

    /// Run a single check and report the outcome
    Check {
        /// Log alerts instead of emailing them
        #[arg(long)]
        dry_run: bool,
    },

    /// Fetch and print the current exchange rate
    Fetch,

    /// Send a sample alert email using the configured SMTP settings
    TestEmail,

    /// Print the effective configuration with secrets masked
    Config,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        generate_completions(shell);
        return ExitCode::SUCCESS;
    }

    dotenvy::dotenv().ok();

    // Load configuration
    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging
    let _log_guard = match ratewatch::telemetry::init(&config.logging, cli.verbose) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error initializing logging: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Execute command
    let result = match cli.command {
        Commands::Run { dry_run } => run_monitor(&config, dry_run).await,
        Commands::Check { dry_run } => run_check(&config, dry_run, cli.format).await,
        Commands::Fetch => run_fetch(&config, cli.format).await,
        Commands::TestEmail => run_test_email(&config).await,
        Commands::Config => show_config(&config, cli.format),
        Commands::Completions { .. } => Ok(()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn build_fetcher(config: &Config, clock: Arc<dyn Clock>) -> anyhow::Result<ExchangeRateApiFetcher> {
    ExchangeRateApiFetcher::new(&config.api, clock).context("failed to create rate fetcher")
}

fn build_orchestrator(config: &Config, dry_run: bool) -> anyhow::Result<CheckCycleOrchestrator> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let fetcher = Arc::new(build_fetcher(config, clock.clone())?);

    let sender: Arc<dyn AlertSender> = if dry_run {
        Arc::new(LogAlertSender)
    } else {
        Arc::new(SmtpAlertSender::from_config(&config.email).context("invalid email settings")?)
    };

    let cache = Arc::new(NotificationCache::new(clock.clone()));
    let dispatcher = Arc::new(AlertDispatcher::new(
        cache,
        sender,
        clock.clone(),
        config.thresholds,
        config.alerting.cooldown_minutes,
    ));
    let cycle = CheckCycle::new(fetcher, ThresholdEvaluator::new(config.thresholds), dispatcher);

    Ok(CheckCycleOrchestrator::new(
        config.schedule.polling_interval_hours,
        cycle,
        clock,
    )?)
}

async fn run_monitor(config: &Config, dry_run: bool) -> anyhow::Result<()> {
    let orchestrator = build_orchestrator(config, dry_run)?;

    info!(
        pair = %format!("{}/{}", config.api.base_currency, config.api.target_currency),
        upper = config.thresholds.upper,
        lower = config.thresholds.lower,
        cooldown_minutes = config.alerting.cooldown_minutes,
        dry_run,
        "RateWatch starting"
    );

    let interrupted = tokio::select! {
        () = orchestrator.start() => false,
        signal = tokio::signal::ctrl_c() => {
            signal?;
            true
        }
    };

    if interrupted {
        info!("Interrupted during startup check, waiting for it to finish");
    } else {
        tokio::signal::ctrl_c().await?;
        info!("Ctrl+C received, shutting down...");
    }

    if let Some(task) = orchestrator.stop() {
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "Monitor task ended abnormally");
        }
    }

    Ok(())
}

async fn run_check(config: &Config, dry_run: bool, format: OutputFormat) -> anyhow::Result<()> {
    let orchestrator = build_orchestrator(config, dry_run)?;
    let outcome = orchestrator.execute_check().await;

    match format {
        OutputFormat::Json => println!("{}", serde_json::json!({ "outcome": outcome })),
        OutputFormat::Text => println!("Check outcome: {outcome}"),
    }

    match outcome {
        CycleOutcome::Skipped => bail!("no rate data available"),
        CycleOutcome::DeliveryFailed => bail!("alert delivery failed"),
        CycleOutcome::Aborted => bail!("check cycle aborted"),
        CycleOutcome::WithinRange | CycleOutcome::Sent | CycleOutcome::Suppressed => Ok(()),
    }
}

async fn run_fetch(config: &Config, format: OutputFormat) -> anyhow::Result<()> {
    let fetcher = build_fetcher(config, Arc::new(SystemClock))?;

    let Some(reading) = fetcher.fetch_current_rate().await else {
        bail!("no rate data available from {}", fetcher.source());
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reading)?),
        OutputFormat::Text => {
            println!("{}: {:.4}", reading.pair(), reading.conversion_rate());
            println!("   Source:   {}", reading.source());
            println!("   Observed: {}", reading.observed_at().to_rfc3339());
            println!(
                "   Range:    {:.4} - {:.4}",
                config.thresholds.lower, config.thresholds.upper
            );
        }
    }
    Ok(())
}

async fn run_test_email(config: &Config) -> anyhow::Result<()> {
    let sender = SmtpAlertSender::from_config(&config.email).context("invalid email settings")?;

    let sample = RateReading::new(
        &config.api.base_currency,
        &config.api.target_currency,
        config.thresholds.upper,
        Utc::now(),
        "test",
    )?;
    let mut payload = build_payload(&sample, Condition::AboveUpper, &config.thresholds, Utc::now());
    payload.subject = format!("[TEST] {}", payload.subject);

    sender.send(&payload).await.context("test email failed")?;
    println!("Test email sent to {}", config.email.to.join(", "));
    Ok(())
}

fn show_config(config: &Config, format: OutputFormat) -> anyhow::Result<()> {
    let redacted = config.redacted();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&redacted)?),
        OutputFormat::Text => println!("{redacted:#?}"),
    }
    Ok(())
}

fn generate_completions(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "ratewatch", &mut io::stdout());
}
