//! LeaveCheck Monitor - replays location traces through the reminder coordinator.
//!
//! # Commands
//!
//! - `leavecheck-monitor replay <TRACE>`: Replay a JSON-lines trace, printing reminders
//! - `leavecheck-monitor items`: List the check item catalog
//! - `leavecheck-monitor settings`: Print the resolved settings
//!
//! # Environment Variables
//!
//! See the [`config`] module for available configuration options.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use leavecheck_core::notification::SNOOZE_ACTION;
use leavecheck_core::CheckItem;
use leavecheck_monitor::config::Config;
use leavecheck_monitor::replay::{parse_trace, Replayer};
use leavecheck_monitor::sender::ConsoleSender;

/// How long to wait for in-flight reminders before exiting.
const DELIVERY_TIMEOUT_SECS: u64 = 5;

/// LeaveCheck Monitor - leave-behind reminder replay.
///
/// Feeds recorded location and visit events through the reminder
/// coordinator and prints every reminder it would send.
#[derive(Parser, Debug)]
#[command(name = "leavecheck-monitor")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "\
ENVIRONMENT VARIABLES:
    LEAVECHECK_ITEMS                  Comma-separated items (default: all)
    LEAVECHECK_MIN_INTERVAL_MINUTES   Cool-down in minutes, 5-240 (default: 30)
    LEAVECHECK_MIN_DISTANCE_METERS    Movement threshold, 50-1000 (default: 200)
    LEAVECHECK_INITIAL_AUTHORIZATION  Location permission at start (default: not_determined)

EXAMPLES:
    # Replay a recorded commute
    leavecheck-monitor replay commute.jsonl

    # Replay from stdin with a shorter cool-down
    LEAVECHECK_MIN_INTERVAL_MINUTES=10 leavecheck-monitor replay - < commute.jsonl
")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a JSON-lines event trace.
    ///
    /// Each reminder is printed to stdout as one JSON line. Logs go to stderr.
    Replay {
        /// Trace file, or `-` for stdin.
        trace: PathBuf,
    },

    /// List the check item catalog and notification actions.
    Items,

    /// Print the settings resolved from the environment as JSON.
    Settings,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Replay { trace } => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("Failed to create tokio runtime")?;

            runtime.block_on(run_replay(trace))
        }
        Command::Items => {
            run_items();
            Ok(())
        }
        Command::Settings => run_settings(),
    }
}

/// Replays a trace through a freshly assembled coordinator.
async fn run_replay(trace: PathBuf) -> Result<()> {
    init_logging();

    let config = Config::from_env().context("Failed to load configuration")?;
    info!(
        items = config.settings.enabled_items().len(),
        interval_minutes = config.settings.minimum_interval_minutes(),
        distance_meters = config.settings.minimum_distance_meters(),
        authorization = %config.initial_authorization,
        "Configuration loaded"
    );

    let reader = open_trace(&trace)?;
    let entries = parse_trace(reader)
        .with_context(|| format!("Failed to parse trace {}", trace.display()))?;

    let start = entries.first().map_or_else(Utc::now, |entry| entry.at);
    let sender = Arc::new(ConsoleSender::stdout());
    let replayer = Replayer::assemble(&config, sender.clone(), start)
        .context("Failed to assemble coordinator")?;

    replayer.coordinator().start();
    let summary = replayer.run(&entries).await.context("Replay failed")?;

    if !sender
        .wait_for(summary.notified, Duration::from_secs(DELIVERY_TIMEOUT_SECS))
        .await
    {
        warn!(
            notified = summary.notified,
            delivered = sender.delivered(),
            "Some reminders were not delivered before exit"
        );
    }

    let counters = replayer.source().counters();
    info!(
        when_in_use_requests = counters.when_in_use_requests,
        always_requests = counters.always_requests,
        monitoring_starts = counters.monitoring_starts,
        monitoring_stops = counters.monitoring_stops,
        "Location source activity"
    );

    Ok(())
}

fn open_trace(trace: &Path) -> Result<Box<dyn BufRead>> {
    if trace.as_os_str() == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = File::open(trace)
        .with_context(|| format!("Failed to open trace {}", trace.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

fn run_items() {
    for item in CheckItem::ALL {
        println!(
            "{:<8} {:<14} {}",
            item.as_str(),
            item.action_identifier(),
            item.label()
        );
    }
    println!(
        "{:<8} {:<14} {}",
        "-", SNOOZE_ACTION.identifier, SNOOZE_ACTION.title
    );
}

fn run_settings() -> Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    let json = serde_json::to_string_pretty(&config.settings)?;
    println!("{json}");
    Ok(())
}

/// Initializes the tracing subscriber for logging.
///
/// Logs go to stderr so stdout carries only reminders.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .with_level(true)
        .init();
}
