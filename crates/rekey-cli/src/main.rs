#![doc = include_str!("../README.md")]

mod config;
mod telemetry;

use anyhow::Context;
use clap::Parser;
use config::{AppConfig, CliArgs};
use rekey::{CsvSink, CsvSource, Pipeline, PipelineConfig, RandomUuidGenerator};
use std::fs::File;
use std::sync::Arc;
use telemetry::init_telemetry;

// Rows are allocated and freed across worker threads for the whole run.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = AppConfig::try_from(args)?;

    init_telemetry()?;

    #[cfg(feature = "tracing")]
    tracing::info!("Starting CSV processing...");
    log_startup_info(&config);

    let input = File::open(&config.input)
        .with_context(|| format!("failed to open input {}", config.input.display()))?;
    let output = File::create(&config.output)
        .with_context(|| format!("failed to open output {}", config.output.display()))?;

    let pipeline = Pipeline::new(PipelineConfig::default(), RandomUuidGenerator::default())?;
    let sink = Arc::new(CsvSink::new(output));
    let _summary = pipeline.run(CsvSource::new(input), Arc::clone(&sink))?;

    // Every worker has been joined, so this is the last reference.
    let sink = Arc::into_inner(sink).context("output sink is still shared")?;
    let output = sink.into_inner().context("failed to flush output")?;
    output
        .sync_all()
        .with_context(|| format!("failed to sync output {}", config.output.display()))?;

    #[cfg(feature = "tracing")]
    {
        tracing::debug!("{_summary}");
        tracing::info!("CSV processing complete.");
    }
    Ok(())
}

fn log_startup_info(_config: &AppConfig) {
    #[cfg(feature = "tracing")]
    tracing::info!(
        "Reading {} and writing {}",
        _config.input.display(),
        _config.output.display()
    );
}
