//! Pipeline orchestrator: drain thread, printer and shutdown.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{EventSource, HubEvent};
use hub_engine::HubEngine;
use tokio::sync::oneshot;
use tracing::{info, warn};

use super::drain::{drain_loop, DrainLoopConfig};
use super::{PipelineStats, PrintStats};
use crate::cli::OutputFormat;

/// How long to wait for the drain thread after stopping it
const DRAIN_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Events requested per drain call
    pub drain_capacity: usize,

    /// Channel buffer size
    pub buffer_size: usize,

    pub output: OutputFormat,

    /// Stop after this many sensor events (None = unlimited)
    pub max_events: Option<u64>,

    /// Run timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Stop on Ctrl+C / SIGTERM
    pub handle_signals: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            drain_capacity: 64,
            buffer_size: 256,
            output: OutputFormat::Json,
            max_events: None,
            timeout: None,
            handle_signals: true,
        }
    }
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Drain `engine` on a dedicated thread and print its events.
    ///
    /// Ends when `finished` reports the source done, when `max_events` is
    /// reached, on timeout, or on a shutdown signal.
    pub async fn run<S, F>(self, engine: HubEngine<S>, finished: F) -> Result<PipelineStats>
    where
        S: EventSource + 'static,
        F: Fn(&HubEngine<S>) -> bool + Send + 'static,
    {
        let start_time = Instant::now();
        let (tx, rx) = async_channel::bounded::<HubEvent>(self.config.buffer_size.max(1));
        let stop = Arc::new(AtomicBool::new(false));
        let (report_tx, report_rx) = oneshot::channel();

        let loop_config = DrainLoopConfig {
            capacity: self.config.drain_capacity,
            ..Default::default()
        };
        let thread_stop = Arc::clone(&stop);
        thread::Builder::new()
            .name("hub-drain".to_string())
            .spawn(move || {
                let report = drain_loop(engine, tx, thread_stop, loop_config, finished);
                let _ = report_tx.send(report);
            })
            .context("Failed to spawn drain thread")?;

        info!(
            capacity = self.config.drain_capacity,
            max_events = ?self.config.max_events,
            "Pipeline running"
        );

        let mut printed = PrintStats::default();
        let printing = async {
            match self.config.timeout {
                Some(timeout) => {
                    match tokio::time::timeout(timeout, print_events(&rx, &mut printed, &self.config))
                        .await
                    {
                        Ok(result) => result,
                        Err(_) => {
                            warn!(timeout_secs = timeout.as_secs(), "Pipeline timed out");
                            Ok(())
                        }
                    }
                }
                None => print_events(&rx, &mut printed, &self.config).await,
            }
        };

        tokio::select! {
            result = printing => result?,
            _ = shutdown_signal(self.config.handle_signals) => {
                warn!("Received shutdown signal, stopping pipeline...");
            }
        }

        // Shutdown
        stop.store(true, Ordering::Release);
        rx.close();
        let drain = match tokio::time::timeout(DRAIN_JOIN_TIMEOUT, report_rx).await {
            Ok(Ok(report)) => Some(report),
            Ok(Err(_)) => {
                warn!("Drain thread exited without a report");
                None
            }
            Err(_) => {
                warn!("Drain thread still blocked in a read, detaching");
                None
            }
        };

        let stats = PipelineStats {
            printed,
            drain,
            duration: start_time.elapsed(),
        };
        info!(
            events = stats.printed.sensor_events,
            duration_secs = stats.duration.as_secs_f64(),
            "Pipeline shutdown complete"
        );
        Ok(stats)
    }
}

/// Receive and write events until the channel closes or the limit is hit
async fn print_events(
    rx: &async_channel::Receiver<HubEvent>,
    printed: &mut PrintStats,
    config: &PipelineConfig,
) -> Result<()> {
    while let Ok(event) = rx.recv().await {
        match &event {
            HubEvent::Sensor(_) => printed.sensor_events += 1,
            HubEvent::FlushComplete { .. } => printed.flush_events += 1,
        }

        match config.output {
            OutputFormat::Json => {
                let line = serde_json::to_string(&event).context("Failed to serialize event")?;
                let mut stdout = io::stdout().lock();
                if let Err(e) = writeln!(stdout, "{line}") {
                    if e.kind() == io::ErrorKind::BrokenPipe {
                        info!("stdout closed");
                        return Ok(());
                    }
                    return Err(e).context("Failed to write event");
                }
            }
            OutputFormat::Log => match &event {
                HubEvent::Sensor(e) => info!(
                    sensor = %e.sensor,
                    handle = %e.handle,
                    timestamp = e.timestamp,
                    hub_timestamp = e.hub_timestamp,
                    payload = ?e.payload,
                    "event"
                ),
                HubEvent::FlushComplete { handle } => info!(handle = %handle, "flush complete"),
            },
            OutputFormat::None => {}
        }

        if let Some(max) = config.max_events {
            if printed.sensor_events >= max {
                info!(events = printed.sensor_events, "Reached max events limit");
                break;
            }
        }
    }
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM; never resolves when disabled
async fn shutdown_signal(enabled: bool) {
    if !enabled {
        return std::future::pending().await;
    }

    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{EngineConfig, SensorId};
    use ingestion::{encode_records, meta_record, sensor_record};

    fn capture(records: &[contracts::SensorRecord]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&encode_records(records)).unwrap();
        file
    }

    fn quiet() -> PipelineConfig {
        PipelineConfig {
            drain_capacity: 4,
            output: OutputFormat::None,
            handle_signals: false,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_decodes_whole_capture() {
        let records: Vec<_> = (0..10)
            .map(|i| sensor_record(SensorId::Accelerometer, [i, 0, 0], i64::from(i)))
            .chain([meta_record(SensorId::Accelerometer)])
            .collect();
        let file = capture(&records);
        let engine = device::replay_engine(file.path(), &EngineConfig::default()).unwrap();

        let stats = Pipeline::new(quiet())
            .run(engine, |e| {
                e.pending_records() == 0 && e.source().is_exhausted()
            })
            .await
            .unwrap();

        assert_eq!(stats.printed.sensor_events, 10);
        assert_eq!(stats.printed.flush_events, 1);
        let drain = stats.drain.unwrap();
        assert_eq!(drain.engine.events_emitted, 10);
        assert!(!drain.partial_tail);
    }

    #[tokio::test]
    async fn test_max_events_stops_early() {
        let records: Vec<_> = (0..50)
            .map(|i| sensor_record(SensorId::Gyroscope, [i, 0, 0], 0))
            .collect();
        let file = capture(&records);
        let engine = device::replay_engine(file.path(), &EngineConfig::default()).unwrap();

        let stats = Pipeline::new(PipelineConfig {
            max_events: Some(5),
            buffer_size: 1,
            ..quiet()
        })
        .run(engine, |e| {
            e.pending_records() == 0 && e.source().is_exhausted()
        })
        .await
        .unwrap();

        assert_eq!(stats.printed.sensor_events, 5);
    }

    #[tokio::test]
    async fn test_partial_tail_reported() {
        let mut bytes = encode_records(&[sensor_record(SensorId::Light, [1, 0, 0], 0)]).to_vec();
        bytes.extend_from_slice(&[0u8; 10]);
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&bytes).unwrap();
        let engine = device::replay_engine(file.path(), &EngineConfig::default()).unwrap();

        let stats = Pipeline::new(quiet())
            .run(engine, |e| {
                e.pending_records() == 0 && e.source().is_exhausted()
            })
            .await
            .unwrap();

        assert_eq!(stats.printed.sensor_events, 1);
        assert!(stats.drain.unwrap().partial_tail);
    }
}
