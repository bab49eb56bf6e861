//! Pipeline statistics.

use std::time::Duration;

use super::DrainReport;

/// What the printer wrote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrintStats {
    pub sensor_events: u64,
    pub flush_events: u64,
}

/// Statistics from a pipeline run
#[derive(Debug, Default)]
pub struct PipelineStats {
    pub printed: PrintStats,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Drain thread report, absent if the thread was detached
    pub drain: Option<DrainReport>,
}

impl PipelineStats {
    /// Sensor events per second
    pub fn events_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.printed.sensor_events as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary to stderr, keeping stdout for events
    pub fn print_summary(&self) {
        eprintln!("\n╔══════════════════════════════════════════════════════════════╗");
        eprintln!("║                    Pipeline Statistics                       ║");
        eprintln!("╚══════════════════════════════════════════════════════════════╝\n");

        eprintln!("Overview");
        eprintln!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        eprintln!("   ├─ Sensor events: {}", self.printed.sensor_events);
        eprintln!("   ├─ Flush completions: {}", self.printed.flush_events);
        eprintln!("   └─ Events/s: {:.2}", self.events_per_sec());

        let Some(report) = &self.drain else {
            eprintln!("\n(drain thread did not report)");
            return;
        };

        let engine = &report.engine;
        eprintln!("\nEngine");
        eprintln!("   ├─ Records routed: {}", engine.records);
        eprintln!("   ├─ Events emitted: {}", engine.events_emitted);
        eprintln!("   ├─ Suppressed (disabled): {}", engine.suppressed);
        eprintln!("   ├─ Protocol anomalies: {}", engine.anomalies);
        eprintln!("   ├─ Malformed windows: {}", engine.malformed);
        eprintln!("   └─ Transport failures: {}", engine.transport_failures);

        let ingestion = &report.ingestion;
        eprintln!("\nIngestion");
        eprintln!("   ├─ Reads: {}", ingestion.reads);
        eprintln!("   ├─ Bytes read: {}", ingestion.bytes_read);
        eprintln!("   ├─ Windows buffered: {}", ingestion.windows_buffered);
        eprintln!("   └─ Read errors: {}", ingestion.read_errors);

        eprintln!("\n{}", report.aggregator.summary());

        if report.partial_tail {
            eprintln!("Stream ended inside a record; trailing bytes discarded");
        }
        if let Some(e) = &report.error {
            eprintln!("Drain stopped after repeated failures: {e}");
        }
    }
}
