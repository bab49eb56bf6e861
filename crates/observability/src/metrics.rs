//! Hub metrics.
//!
//! Thin wrappers over the `metrics` macros plus an in-memory aggregator for
//! run summaries.

use std::collections::BTreeMap;
use std::fmt;

use contracts::HubEvent;
use metrics::{counter, gauge, histogram};

/// A sensor record was decoded and applied to its slot
pub fn record_record_decoded(sensor: &'static str) {
    counter!("hub_records_decoded_total", "sensor" => sensor).increment(1);
}

/// A sensor event was handed out
pub fn record_event_emitted(sensor: &'static str) {
    counter!("hub_events_emitted_total", "sensor" => sensor).increment(1);
}

pub fn record_flush_complete() {
    counter!("hub_flush_complete_total").increment(1);
}

/// Record dropped or ignored because it violated the wire protocol
pub fn record_protocol_anomaly(kind: &'static str) {
    counter!("hub_protocol_anomalies_total", "kind" => kind).increment(1);
}

pub fn record_malformed_window() {
    counter!("hub_malformed_windows_total").increment(1);
}

/// Failed read or control write
pub fn record_transport_failure(operation: &'static str) {
    counter!("hub_transport_failures_total", "operation" => operation).increment(1);
}

pub fn record_resync_requested() {
    counter!("hub_resync_requests_total").increment(1);
}

pub fn record_resync_committed() {
    counter!("hub_resync_commits_total").increment(1);
}

pub fn record_enabled_sensors(count: u32) {
    gauge!("hub_enabled_sensors").set(f64::from(count));
}

/// One drain call: events returned, windows left buffered, elapsed time
pub fn record_drain(events: usize, pending: usize, elapsed_us: f64) {
    histogram!("hub_drain_batch_size").record(events as f64);
    histogram!("hub_drain_latency_us").record(elapsed_us);
    gauge!("hub_pending_records").set(pending as f64);
}

/// Per-run drain totals
#[derive(Debug, Clone, Default)]
pub struct DrainStatsAggregator {
    /// Drain calls
    pub drains: u64,
    /// Drain calls that returned nothing
    pub empty_drains: u64,
    /// Sensor events
    pub total_events: u64,
    /// Flush completions
    pub flush_completions: u64,
    /// Drain calls that ended in an error
    pub errors: u64,
    /// Events per drain call
    pub batch_stats: RunningStats,
    /// Drain latency in microseconds
    pub latency_stats: RunningStats,
    /// Events per sensor name
    pub per_sensor: BTreeMap<&'static str, u64>,
}

impl DrainStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account one drain call
    pub fn update(&mut self, events: &[HubEvent], elapsed_us: f64) {
        self.drains += 1;
        if events.is_empty() {
            self.empty_drains += 1;
        }
        self.batch_stats.push(events.len() as f64);
        self.latency_stats.push(elapsed_us);

        for event in events {
            match event {
                HubEvent::Sensor(e) => {
                    self.total_events += 1;
                    *self.per_sensor.entry(e.sensor.name()).or_insert(0) += 1;
                }
                HubEvent::FlushComplete { .. } => self.flush_completions += 1,
            }
        }
    }

    pub fn record_error(&mut self) {
        self.errors += 1;
    }

    pub fn summary(&self) -> DrainSummary {
        DrainSummary {
            drains: self.drains,
            empty_drains: self.empty_drains,
            total_events: self.total_events,
            flush_completions: self.flush_completions,
            errors: self.errors,
            batch_size: StatsSummary::from(&self.batch_stats),
            latency_us: StatsSummary::from(&self.latency_stats),
            per_sensor: self.per_sensor.clone(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Run summary
#[derive(Debug, Clone, Default)]
pub struct DrainSummary {
    pub drains: u64,
    pub empty_drains: u64,
    pub total_events: u64,
    pub flush_completions: u64,
    pub errors: u64,
    pub batch_size: StatsSummary,
    pub latency_us: StatsSummary,
    pub per_sensor: BTreeMap<&'static str, u64>,
}

impl fmt::Display for DrainSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Drain Summary ===")?;
        writeln!(
            f,
            "Drain calls: {} ({} empty, {} failed)",
            self.drains, self.empty_drains, self.errors
        )?;
        writeln!(f, "Sensor events: {}", self.total_events)?;
        writeln!(f, "Flush completions: {}", self.flush_completions)?;
        writeln!(f, "Batch size: {}", self.batch_size)?;
        writeln!(f, "Latency (us): {}", self.latency_us)?;

        if !self.per_sensor.is_empty() {
            writeln!(f, "Events per sensor:")?;
            for (sensor, count) in &self.per_sensor {
                writeln!(f, "  {sensor}: {count}")?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            self.m2 += delta * (value - self.mean);
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
