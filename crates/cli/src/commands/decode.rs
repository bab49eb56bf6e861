//! `decode` command implementation.

use anyhow::{Context, Result};
use contracts::EngineConfig;
use tracing::info;

use crate::cli::DecodeArgs;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `decode` command
pub async fn run_decode(args: &DecodeArgs) -> Result<()> {
    info!(capture = %args.capture.display(), "Decoding capture");

    let engine_config = EngineConfig {
        drain_capacity: args.drain_capacity,
        ..EngineConfig::default()
    };
    let engine = device::replay_engine(&args.capture, &engine_config)
        .with_context(|| format!("Failed to open capture {}", args.capture.display()))?;

    let stats = Pipeline::new(PipelineConfig {
        drain_capacity: args.drain_capacity,
        output: args.output,
        max_events: (args.max_events > 0).then_some(args.max_events),
        ..PipelineConfig::default()
    })
    .run(engine, |engine| {
        engine.pending_records() == 0 && engine.source().is_exhausted()
    })
    .await
    .context("Decode failed")?;

    stats.print_summary();
    Ok(())
}
