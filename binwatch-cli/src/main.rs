//! Command line entry point that polls bins on a schedule until Ctrl-C.

mod cli;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use binwatch_core::{Driver, PluginRegistry, TrackerConfig, TrackerService};
use binwatch_provider_http as http;
use binwatch_provider_sim as sim;

use crate::cli::Cli;

const DEFAULT_LOG_FILTER: &str = "info,binwatch=debug";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.load_config()?;

    if cli.print_config {
        return print_config(&config);
    }

    // HTTP + backend setup
    let client = http::build_client(config.request_timeout())?;
    let registry = PluginRegistry::new(vec![
        http::plugin(client, &config),
        sim::plugin(Arc::new(sim::SimulatedBins::new())),
    ]);
    let plugin = registry
        .plugin(&config.backend)
        .with_context(|| format!("available backends: {}", registry.backends().join(", ")))?;
    info!(
        backend = %plugin.id,
        bins = ?config.bins,
        threshold = config.threshold,
        interval_secs = config.interval_secs,
        "smart waste tracker configured"
    );

    let service = TrackerService::new(&config, plugin);
    let mut driver = Driver::new(service, config.interval());

    if cli.once {
        driver.run_once().await;
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let driver_handle = tokio::spawn(driver.run(shutdown_rx));

    let signal = tokio::signal::ctrl_c().await;
    match &signal {
        Ok(()) => info!("shutdown signal received, exiting"),
        Err(err) => error!(error = %err, "cannot listen for Ctrl-C, stopping"),
    }
    shutdown_tx.send(true).ok();

    let summary = driver_handle.await?;
    info!(cycles = summary.cycles, failed = summary.failed, "binwatch stopped");

    signal.map_err(Into::into)
}

#[expect(clippy::print_stdout, reason = "the rendered config is the command output")]
fn print_config(config: &TrackerConfig) -> Result<()> {
    print!("{}", config.to_toml_string()?);
    Ok(())
}
