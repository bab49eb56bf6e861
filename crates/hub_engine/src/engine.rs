//! Hub engine: record routing and the output drainer.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use contracts::{
    EngineConfig, EventSource, HubError, HubEvent, RecordKind, SensorEvent, SensorId,
    SensorRecord, TimestampPolicy,
};
use ingestion::{decode_record, IngestionMetrics, ReaderConfig, RecordReader};
use serde::Serialize;
use tracing::{debug, instrument, trace, warn};

use crate::control::HubControl;
use crate::oneshot;
use crate::synth::synthesize;
use crate::table::SensorTable;

/// Result of one drain call.
///
/// Events gathered before a transport failure are kept alongside the error.
#[derive(Debug, Default)]
pub struct DrainOutcome {
    pub events: Vec<HubEvent>,
    pub error: Option<HubError>,
}

impl DrainOutcome {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Events if no error occurred
    pub fn into_result(self) -> Result<Vec<HubEvent>, HubError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.events),
        }
    }
}

/// Engine counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    /// Records routed (all kinds)
    pub records: u64,
    /// Sensor events handed out
    pub events_emitted: u64,
    /// Flush completions handed out
    pub flush_completions: u64,
    /// Sensor records decoded while the sensor was disabled
    pub suppressed: u64,
    /// Unknown ids or metadata for unknown sensors
    pub anomalies: u64,
    /// Windows that failed to decode
    pub malformed: u64,
    /// Failed reads
    pub transport_failures: u64,
}

/// Hub engine
///
/// Owns the event source, the record reader and the slot table. Exactly one
/// context drains at a time; control operations go through the shared
/// `HubControl`.
pub struct HubEngine<S = Box<dyn EventSource>> {
    source: S,
    reader: RecordReader,
    table: SensorTable,
    control: Arc<HubControl>,
    policy: TimestampPolicy,
    stats: EngineStats,
}

impl<S> fmt::Debug for HubEngine<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HubEngine")
            .field("reader", &self.reader)
            .field("pending", &self.table.pending())
            .field("policy", &self.policy)
            .field("stats", &self.stats)
            .finish()
    }
}

impl<S: EventSource> HubEngine<S> {
    /// Create an engine with its own reader metrics
    pub fn new(source: S, control: Arc<HubControl>, config: &EngineConfig) -> Self {
        Self::with_metrics(source, control, config, Arc::new(IngestionMetrics::new()))
    }

    /// Create an engine sharing reader metrics
    pub fn with_metrics(
        source: S,
        control: Arc<HubControl>,
        config: &EngineConfig,
        metrics: Arc<IngestionMetrics>,
    ) -> Self {
        Self {
            source,
            reader: RecordReader::with_metrics(ReaderConfig::new(config.reader_capacity), metrics),
            table: SensorTable::new(),
            control,
            policy: config.timestamp_policy,
            stats: EngineStats::default(),
        }
    }

    /// Drain up to `capacity` events.
    ///
    /// Buffered windows are routed first. The source is read at most once
    /// per call, and only once the buffered windows run out. Windows left
    /// over when capacity is reached stay buffered for the next call.
    #[instrument(name = "hub_drain", level = "debug", skip(self), fields(emitted = tracing::field::Empty))]
    pub fn drain(&mut self, capacity: usize) -> DrainOutcome {
        let mut outcome = DrainOutcome {
            events: Vec::with_capacity(capacity.min(64)),
            error: None,
        };
        if capacity == 0 {
            return outcome;
        }

        let started = Instant::now();
        let mut filled = false;
        while outcome.events.len() < capacity {
            let Some(window) = self.reader.pop_window() else {
                if filled {
                    break;
                }
                filled = true;
                match self.reader.fill(&mut self.source) {
                    Ok(0) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        self.stats.transport_failures += 1;
                        observability::record_transport_failure("read");
                        outcome.error = Some(e);
                        break;
                    }
                }
            };

            let record = match decode_record(&window) {
                Ok(record) => record,
                Err(e) => {
                    self.stats.malformed += 1;
                    self.reader.metrics().record_malformed();
                    observability::record_malformed_window();
                    debug!(error = %e, "skipping malformed window");
                    continue;
                }
            };

            if let Some(event) = self.route(&record) {
                outcome.events.push(event);
            }
        }

        tracing::Span::current().record("emitted", outcome.events.len());
        observability::record_drain(
            outcome.events.len(),
            self.reader.pending(),
            started.elapsed().as_secs_f64() * 1_000_000.0,
        );
        outcome
    }

    /// Route one decoded record, returning the event to emit, if any
    fn route(&mut self, record: &SensorRecord) -> Option<HubEvent> {
        self.stats.records += 1;
        match record.kind() {
            RecordKind::Sensor(sensor) => self.route_sensor(sensor, record),
            RecordKind::MetaData => self.route_meta(record),
            RecordKind::SyncAck => {
                self.control.on_sync_ack(record.values[0]);
                None
            }
            RecordKind::TimeDiffExhausted => {
                self.control.on_time_diff_exhausted(record.values[0]);
                None
            }
            RecordKind::Unknown(wire_id) => {
                self.stats.anomalies += 1;
                warn!(wire_id, "unknown wire id, record dropped");
                observability::record_protocol_anomaly("unknown_wire_id");
                None
            }
        }
    }

    fn route_sensor(&mut self, sensor: SensorId, record: &SensorRecord) -> Option<HubEvent> {
        let now = self.control.clock().now_ns();
        synthesize(&mut self.table, sensor, record, now);
        observability::record_record_decoded(sensor.name());
        trace!(sensor = %sensor, wire_id = record.wire_id, "record decoded");

        if !self.control.is_sensor_enabled(sensor) {
            self.stats.suppressed += 1;
            return None;
        }
        if sensor.is_one_shot() {
            oneshot::disarm(&self.control, sensor);
        }

        let event = self.emit_slot(sensor);
        self.stats.events_emitted += 1;
        observability::record_event_emitted(sensor.name());
        Some(HubEvent::Sensor(event))
    }

    fn route_meta(&mut self, record: &SensorRecord) -> Option<HubEvent> {
        let target = u8::try_from(record.values[0])
            .ok()
            .and_then(SensorId::from_wire);
        let Some(target) = target else {
            self.stats.anomalies += 1;
            warn!(value = record.values[0], "flush completion for unknown sensor");
            observability::record_protocol_anomaly("meta_unknown_sensor");
            return None;
        };

        let handle = target.handle();
        self.stats.flush_completions += 1;
        observability::record_flush_complete();
        debug!(sensor = %target, handle = %handle, "flush complete");
        Some(HubEvent::FlushComplete { handle })
    }

    /// Current slot event with the delivery timestamp applied
    fn emit_slot(&mut self, sensor: SensorId) -> SensorEvent {
        self.table.clear_pending(sensor);
        let mut event = self.table.slot(sensor).event;
        if self.policy == TimestampPolicy::HubCorrected {
            if let Some(corrected) = self.control.clock_sync().corrected(event.hub_timestamp) {
                event.timestamp = corrected;
            }
        }
        event
    }

    /// Drop an incomplete trailing window once the source has ended
    pub fn finish(&mut self) -> Option<HubError> {
        let err = self.reader.discard_partial();
        if err.is_some() {
            self.stats.malformed += 1;
            observability::record_malformed_window();
        }
        err
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn table(&self) -> &SensorTable {
        &self.table
    }

    pub fn control(&self) -> &Arc<HubControl> {
        &self.control
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// Complete windows buffered but not yet routed
    pub fn pending_records(&self) -> usize {
        self.reader.pending()
    }

    pub fn reader_metrics(&self) -> &Arc<IngestionMetrics> {
        self.reader.metrics()
    }

    pub fn timestamp_policy(&self) -> TimestampPolicy {
        self.policy
    }
}
