//! CLI entry point for the adscout tool.

use std::sync::Arc;

use adscout_core::{
    AppSync, ColumnMatcher, Database, MatchMode, MetadataEndpoints, PageFetcher,
    RetryOrchestrator, ScanConfig, ScanEngine, SingleFlightCache, SqliteMetadataStore,
    SyncOptions, build_default_metadata_resolver, read_lines,
};
use adscout_core::report::{write_failures, write_results};
use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

mod app_config;
mod cli;

use cli::{Cli, Command, ScanArgs, SyncArgs};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?cli, "CLI arguments parsed");

    let mut config = ScanConfig::default();
    if let Some(file_config) = app_config::load_file_config(cli.config.as_deref())? {
        file_config.apply(&mut config)?;
        debug!(?file_config, "config file applied");
    }

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling run");
            signal_cancel.cancel();
        }
    });

    match cli.command {
        Command::Scan(args) => run_scan(args, config, &cancel).await,
        Command::SyncApps(args) => run_sync(args, &config, &cancel).await,
    }
}

async fn run_scan(args: ScanArgs, mut config: ScanConfig, cancel: &CancellationToken) -> Result<()> {
    if let Some(concurrency) = args.concurrency {
        config.concurrency = usize::from(concurrency);
    }
    if let Some(retries) = args.retries {
        config.retry_attempts = u32::from(retries);
    }
    if let Some(min_lines) = args.min_lines {
        config.min_lines = min_lines;
    }
    if let Some(cache_dir) = args.cache_dir {
        config.cache_dir = Some(cache_dir);
    }
    config.validate()?;

    let targets = read_lines(&args.targets).await?;
    let columns = read_lines(&args.columns).await?;
    info!(targets = targets.len(), columns = columns.len(), "adscout scan starting");

    let mode = if args.presence {
        MatchMode::Presence
    } else {
        MatchMode::Lines
    };
    let matcher = ColumnMatcher::new(&columns, mode);

    let store_fetcher = Arc::new(
        PageFetcher::new(config.store_timeouts()).context("failed to build store HTTP client")?,
    );
    let disclosure_fetcher = Arc::new(
        PageFetcher::new(config.disclosure_timeouts())
            .context("failed to build disclosure HTTP client")?,
    );

    let resolver = Arc::new(build_default_metadata_resolver(
        store_fetcher,
        &MetadataEndpoints::default(),
    ));
    let slots = config
        .disk_slots()
        .context("failed to create cache directory")?;
    debug!(dir = %slots.dir().display(), temporary = slots.is_temporary(), "cache slots ready");
    let cache = Arc::new(SingleFlightCache::new(disclosure_fetcher, slots));
    let orchestrator = Arc::new(RetryOrchestrator::new(
        resolver,
        cache,
        config.retry_policy(),
    ));
    let engine = ScanEngine::new(config.concurrency, orchestrator, matcher, config.min_lines)?;

    let report = engine.run(&targets, cancel).await?;

    write_results(&args.output, &columns, &report.rows)?;
    write_failures(&args.failed, &report.failed)?;

    info!(
        succeeded = report.stats.succeeded(),
        soft_failed = report.stats.soft_failed(),
        failed = report.stats.failed(),
        malformed = report.stats.malformed(),
        total = report.stats.total(),
        "Scan complete"
    );
    Ok(())
}

async fn run_sync(args: SyncArgs, config: &ScanConfig, cancel: &CancellationToken) -> Result<()> {
    config.validate()?;
    let targets = read_lines(&args.targets).await?;
    info!(targets = targets.len(), db = %args.db.display(), "adscout sync-apps starting");

    let db = Database::new(&args.db)
        .await
        .with_context(|| format!("failed to open database '{}'", args.db.display()))?;
    let store = Arc::new(SqliteMetadataStore::new(db.clone()));

    let fetcher = Arc::new(
        PageFetcher::new(config.store_timeouts()).context("failed to build store HTTP client")?,
    );
    let resolver = Arc::new(build_default_metadata_resolver(
        fetcher,
        &MetadataEndpoints::default(),
    ));

    let options = SyncOptions {
        force: args.force,
        only_new_apps: args.only_new_apps,
        concurrency: usize::from(args.concurrency),
    };
    let sync = AppSync::new(resolver, store, options)?;
    let stats = sync.run(&targets, cancel).await?;

    db.close().await;

    info!(
        stored = stats.stored(),
        not_found = stats.not_found(),
        skipped = stats.skipped(),
        failed = stats.failed(),
        cancelled = stats.cancelled(),
        "Sync complete"
    );
    Ok(())
}
