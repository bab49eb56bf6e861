//! `run` command implementation.

use std::time::Duration;

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_hub(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let mut config = ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Apply CLI overrides
    if let Some(capacity) = args.drain_capacity {
        info!(capacity, "Overriding drain capacity from CLI");
        config.engine.drain_capacity = capacity;
    }
    if let Some(port) = args.metrics_port {
        info!(port, "Overriding metrics port from CLI");
        config.observability.metrics_port = Some(port);
    }

    info!(
        device = %config.device.device_name,
        sensors = config.sensors.len(),
        policy = ?config.engine.timestamp_policy,
        "Configuration loaded"
    );

    if let Some(port) = config.observability.metrics_port {
        observability::init_metrics_only(port).context("Failed to start metrics exporter")?;
    }

    let hub = device::bring_up(&config).context("Hub bring-up failed")?;
    let control = hub.control;

    if let Err(e) = device::apply_sensor_settings(&control, &config.sensors) {
        if let Err(disable) = control.disable_all() {
            warn!(error = %disable, "Failed to disable sensors after start-up failure");
        }
        return Err(e).context("Failed to enable start-up sensors");
    }

    let pipeline = Pipeline::new(PipelineConfig {
        drain_capacity: config.engine.drain_capacity,
        buffer_size: args.buffer_size,
        output: args.output,
        max_events: (args.max_events > 0).then_some(args.max_events),
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        handle_signals: true,
    });

    info!("Starting pipeline...");
    // A live hub never runs dry; only a signal or a limit stops the run
    let result = pipeline.run(hub.engine, |_| false).await;

    if let Err(e) = control.disable_all() {
        warn!(error = %e, "Failed to disable sensors on exit");
    }

    let stats = result.context("Pipeline execution failed")?;
    info!(
        events = stats.printed.sensor_events,
        duration_secs = stats.duration.as_secs_f64(),
        events_per_sec = format!("{:.2}", stats.events_per_sec()),
        "Pipeline completed"
    );
    stats.print_summary();

    info!("hubctl finished");
    Ok(())
}
