use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use docketwatch_common::Config;
use docketwatch_feeds::HttpFeedSource;
use docketwatch_notify::{
    ArchiveLog, Dispatcher, EmailSink, LogSink, NotifySink, SocialPoster,
};
use docketwatch_scout::checkpoint::Checkpoint;
use docketwatch_scout::clock::SystemClock;
use docketwatch_scout::scheduler::{ScheduleSettings, Scheduler};
use docketwatch_scout::watchlist::{JsonCaseList, StaticWatchlist, WatchlistStore};

const DEFAULT_CONFIG: &str = "docketwatch.toml";

#[derive(Parser)]
#[command(
    name = "docketwatch",
    about = "Watch court RSS feeds for new filings in cases of interest"
)]
struct Cli {
    /// Path to a TOML config file. Defaults to ./docketwatch.toml when it
    /// exists, otherwise built-in defaults.
    #[arg(long, env = "DOCKETWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// JSON case list; overrides `[watchlist].path`.
    #[arg(long)]
    case_list: Option<PathBuf>,

    /// -v for debug, -vv for trace.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Run a single tick and exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = match cli.verbose {
        0 => "info",
        1 => "info,docketwatch=debug",
        _ => "info,docketwatch=trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    info!("docketwatch starting...");

    let config_path = cli
        .config
        .or_else(|| Some(PathBuf::from(DEFAULT_CONFIG)).filter(|p| p.exists()));
    let mut config = Config::load(config_path.as_deref()).context("Failed to load configuration")?;
    if let Some(path) = cli.case_list {
        config.file.watchlist.path = Some(path);
    }
    config.log_redacted();

    let dispatcher = build_dispatcher(&config).await?;

    let feeds = HttpFeedSource::new(
        config.file.feeds.clone(),
        config.file.schedule.fetch_timeout(),
    )?;

    let store: Arc<dyn WatchlistStore> = match &config.file.watchlist.path {
        Some(path) => {
            info!(path = %path.display(), "Using case list");
            Arc::new(JsonCaseList::new(path.clone()))
        }
        None => {
            warn!("No case list configured, nothing will be watched");
            Arc::new(StaticWatchlist::default())
        }
    };

    let checkpoint = Checkpoint::new(config.file.schedule.checkpoint_path.clone());
    let mut scheduler = Scheduler::new(
        Arc::new(feeds),
        dispatcher,
        store,
        Arc::new(SystemClock),
        ScheduleSettings::from(&config.file.schedule),
    )
    .with_checkpoint(checkpoint);
    if let Some(path) = config.file.watchlist.pause_file.clone() {
        scheduler = scheduler.with_pause_file(path);
    }

    if cli.once {
        let report = scheduler.tick().await;
        info!(
            added = report.added.len(),
            resumed = report.resumed.len(),
            checked = report.checked.len(),
            dispatched = report.dispatched,
            "Single tick complete"
        );
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    scheduler.run(shutdown_rx).await;

    info!("docketwatch stopped");
    Ok(())
}

async fn build_dispatcher(config: &Config) -> Result<Dispatcher> {
    let enabled = &config.file.sinks;
    let mut sinks: Vec<Box<dyn NotifySink>> = Vec::new();

    if enabled.log {
        sinks.push(Box::new(LogSink));
    }
    if enabled.social {
        let token = config
            .social_bearer_token
            .clone()
            .context("SOCIAL_BEARER_TOKEN is required for the social sink")?;
        sinks.push(Box::new(SocialPoster::new(config.file.social.clone(), token)));
    }
    if enabled.email {
        let key = config
            .email_api_key
            .clone()
            .context("EMAIL_API_KEY is required for the email sink")?;
        sinks.push(Box::new(EmailSink::new(&config.file.email, key)?));
    }
    if enabled.archive_log {
        let log = ArchiveLog::connect(&config.file.archive.database_url)
            .await
            .context("Failed to open archive log")?;
        sinks.push(Box::new(log));
    }

    if sinks.is_empty() {
        warn!("No sinks enabled, filings will only be logged by the poller");
    }
    let dispatcher = Dispatcher::new(sinks);
    info!(sinks = ?dispatcher.sink_names(), "Notification sinks ready");
    Ok(dispatcher)
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = ?e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = ?e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
