mod cli;
mod config;
mod logging;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use collector_engine::{
    CheckpointStore, Engine, JobResultStreamer, JsonLinesSink, PassOutcome, PassReport,
    ReqwestJobClient, SyncOrchestrator,
};
use collector_logging::{collector_error, collector_info, collector_warn};

use crate::cli::{Cli, Commands};
use crate::config::CollectorConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::initialize(cli.log_destination(), cli.log_level.into());

    let config = CollectorConfig::load(&cli.config)
        .with_context(|| format!("loading config {:?}", cli.config))?;

    match cli.command {
        Commands::Checkpoint { group } => print_checkpoint(&config, &group),
        Commands::Once => run(config, false),
        Commands::Run => run(config, true),
    }
}

fn print_checkpoint(config: &CollectorConfig, group: &str) -> Result<()> {
    if !config.groups.iter().any(|entry| entry.name == group) {
        bail!("group {group} is not configured");
    }
    let store = CheckpointStore::new(&config.checkpoint_dir);
    for id in store.load(group).iter() {
        println!("{id}");
    }
    Ok(())
}

fn build_engine(config: &CollectorConfig) -> Result<Engine> {
    let env = |name: &str| std::env::var(name).ok();
    let client =
        ReqwestJobClient::new(config.client_settings()).context("building HTTP client")?;
    let orchestrator = SyncOrchestrator::new(
        Arc::new(client),
        Arc::new(JsonLinesSink::stdout()),
        CheckpointStore::new(&config.checkpoint_dir),
        config.lookup_layout(env).context("resolving lookup directory")?,
        JobResultStreamer::new(config.max_line_bytes),
    );
    let credentials = config.credentials(env).context("resolving group credentials")?;
    Ok(Engine::new(
        orchestrator,
        Arc::new(credentials),
        config.realm.clone(),
    ))
}

fn run(config: CollectorConfig, forever: bool) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
    runtime.block_on(collect(config, forever))
}

async fn collect(config: CollectorConfig, forever: bool) -> Result<()> {
    let engine = build_engine(&config)?;
    let cancel = engine.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            collector_warn!("Interrupt received, stopping at the next job boundary");
            cancel.cancel();
        }
    });

    collector_info!(
        "Collector starting realm={} groups={} checkpoint_dir={:?}",
        config.realm,
        config.groups.len(),
        config.checkpoint_dir
    );

    if forever {
        engine.run_until_cancelled(config.poll_interval()).await;
        return Ok(());
    }

    collector_logging::set_round(1);
    let reports = engine.run_round().await;
    log_round(&reports);
    let failed = reports
        .iter()
        .filter(|report| matches!(report.outcome, PassOutcome::ListingFailed(_)))
        .count();
    if failed > 0 {
        bail!("{failed} of {} groups could not be listed", reports.len());
    }
    Ok(())
}

fn log_round(reports: &[PassReport]) {
    for report in reports {
        let summary = &report.summary;
        match &report.outcome {
            PassOutcome::ListingFailed(err) => {
                collector_error!("group_name={} listing failed: {}", report.group, err)
            }
            outcome => collector_info!(
                "group_name={} outcome={:?} downloaded={} failed={} skipped={} lines={} took_ms={}",
                report.group,
                outcome,
                summary.downloaded,
                summary.download_failed,
                summary.skipped_already_done + summary.skipped_not_complete,
                summary.lines_emitted,
                (report.finished_at - report.started_at).num_milliseconds()
            ),
        }
    }
}
