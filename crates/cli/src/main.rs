//! `tickbar`: load tick partitions and resample them into OHLCV bars.

mod args;
mod logging;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tickbar_core::Config;
use tickbar_dataset::{write_bars, DatasetOrchestrator};
use tickbar_ingestion::{CsvPartitionLoader, SeriesLoader, TracingReporter};

use crate::args::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::setup_logging(cli.log_level.as_deref());

    match cli.into_config().and_then(|config| run(&config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &Config) -> Result<()> {
    let datadir = config.paths.resolve()?;
    let freq = config.dataset.freq.as_str();
    let loader = CsvPartitionLoader::new(&datadir, freq);

    let products = if config.dataset.products.is_empty() {
        match loader.products() {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!("No {freq} products found: {err}");
                Vec::new()
            }
        }
    } else {
        config.dataset.products.clone()
    };

    let orchestrator =
        DatasetOrchestrator::new(loader, TracingReporter).with_workers(config.dataset.workers);

    let Some(resolution) = config.effective_resolution() else {
        let loaded = orchestrator.load(&products);
        tracing::info!(
            loaded = loaded.len(),
            skipped = loaded.skipped().count(),
            ticks = loaded.tick_count(),
            "Loaded {freq} data"
        );
        if config.dataset.output.is_some() {
            tracing::warn!("--output needs a resample width for {freq} data, nothing written");
        }
        return Ok(());
    };

    let result = orchestrator.run(&products, resolution);
    for (product, series) in result.iter() {
        tracing::info!(
            product = %product,
            bars = series.len(),
            empty = series.empty_count(),
            volume = series.total_volume(),
            "{product} resampled to {resolution}"
        );
    }
    tracing::info!(
        resampled = result.len(),
        skipped = result.skipped_len(),
        "Resampled {freq} data to {resolution}"
    );

    if let Some(dir) = &config.dataset.output {
        let written = write_bars(dir, &result)
            .with_context(|| format!("failed to write bars to {}", dir.display()))?;
        tracing::info!(files = written.len(), "Wrote bars to {}", dir.display());
    }

    Ok(())
}
