//! Feed Order Monitor
//!
//! Checks that the newest-items listing is really sorted newest-first, once
//! at startup and then on a fixed interval. Failing checks leave a CSV row
//! per mismatch, a log block, a page snapshot and an HTML report behind.
//!
//! Usage:
//!   feed_order_monitor --config feed_monitor.toml
//!   feed_order_monitor --once --window-size 30
//!
//! Environment Variables:
//!   FEED_MONITOR_CONFIG_PATH - Path to TOML config file
//!   FEED_MONITOR_URL - Listing URL override
//!   FEED_MONITOR_WINDOW - Number of items checked per cycle
//!   FEED_MONITOR_PERIOD_SECS - Seconds between cycles
//!   FEED_MONITOR_MAX_CYCLES - Stop after this many scheduled cycles
//!   RUST_LOG - Log filter (default: feed_order_monitor=info)

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use feed_order_monitor::evidence::{FileStore, PageSnapshotCapture};
use feed_order_monitor::feed::{ListingExtractor, PageSession};
use feed_order_monitor::{MonitorConfig, RunCoordinator, Scheduler};

#[derive(Parser, Debug)]
#[command(name = "feed_order_monitor")]
#[command(about = "Verify that a time-ordered listing is sorted newest-first")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listing page to check
    #[arg(long, env = "FEED_MONITOR_URL")]
    feed_url: Option<String>,

    /// Number of leading items checked per cycle
    #[arg(long, env = "FEED_MONITOR_WINDOW")]
    window_size: Option<usize>,

    /// Seconds between cycle starts
    #[arg(long, env = "FEED_MONITOR_PERIOD_SECS")]
    period_secs: Option<u64>,

    /// Open the HTML report after a failing cycle
    #[arg(long)]
    open_report: bool,

    /// Run a single cycle, print its summary as JSON and exit
    #[arg(long)]
    once: bool,

    /// Stop after this many scheduled cycles (runs until Ctrl+C when unset)
    #[arg(long, env = "FEED_MONITOR_MAX_CYCLES", conflicts_with = "once")]
    max_cycles: Option<u64>,

    /// Log filter used when RUST_LOG is unset
    #[arg(short, long, default_value = "feed_order_monitor=info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env();
    let args = Args::parse();
    init_tracing(&args.log_level);

    let mut config = MonitorConfig::resolve(args.config.as_deref())?;
    if let Some(url) = args.feed_url {
        config.feed_url = url;
    }
    if let Some(n) = args.window_size {
        config.window_size = n;
    }
    if let Some(secs) = args.period_secs {
        config.period = Duration::from_secs(secs);
    }
    config.open_report |= args.open_report;
    config.validate()?;

    info!(
        "Checking first {} items of {} every {:?}",
        config.window_size, config.feed_url, config.period
    );

    let store = FileStore::open(&config.storage).context("Failed to prepare evidence storage")?;
    let session = Arc::new(PageSession::new());
    let extractor = Arc::new(ListingExtractor::new(&config, session.clone())?);
    let capture = Arc::new(PageSnapshotCapture::new(session, &config.storage.evidence_dir));

    let mut coordinator = RunCoordinator::new(extractor, capture, store, config.window_size)
        .with_open_report(config.open_report);

    if args.once {
        return match coordinator.run_cycle().await {
            Ok(summary) => {
                println!("{}", serde_json::to_string_pretty(&summary)?);
                Ok(())
            }
            Err(e) => {
                error!("{}", e);
                Err(e.into())
            }
        };
    }

    let mut scheduler = Scheduler::new(config.period);
    if let Some(n) = args.max_cycles {
        scheduler = scheduler.with_max_cycles(n);
    }

    let cycles = scheduler
        .run(&mut coordinator, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;

    info!("Stopped after {} cycles", cycles);
    Ok(())
}

fn init_tracing(default_filter: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_env() {
    // cwd + parents, then the crate directory
    let _ = dotenv();

    let manifest_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    if manifest_env.exists() {
        let _ = dotenv::from_path(&manifest_env);
    }
}
